use crate::proxy::error_classification::{TransportFailure, classify_pingora_error};
use http::StatusCode;
use pingora::{Error, ErrorType};
use pretty_assertions::assert_eq;

#[test]
fn upstream_failures_are_bad_gateway() {
    let cases = [
        (ErrorType::ConnectRefused, TransportFailure::Connect),
        (ErrorType::ConnectNoRoute, TransportFailure::Connect),
        (ErrorType::TLSHandshakeFailure, TransportFailure::Tls),
        (ErrorType::InvalidHTTPHeader, TransportFailure::Protocol),
        (ErrorType::ReadTimedout, TransportFailure::Timeout),
        (ErrorType::ConnectionClosed, TransportFailure::Reset),
    ];

    for (etype, expected) in cases {
        let err = Error::new_up(etype);

        let failure = classify_pingora_error(&err);

        assert_eq!(failure, expected);
        assert_eq!(failure.status(), Some(StatusCode::BAD_GATEWAY));
    }
}

#[test]
fn downstream_disconnects_get_no_response() {
    let err = Error::new_down(ErrorType::WriteError);

    let failure = classify_pingora_error(&err);

    assert_eq!(failure, TransportFailure::Downstream);
    assert_eq!(failure.status(), None);
}

#[test]
fn unclassified_errors_still_fail_closed() {
    let err = Error::new(ErrorType::Custom("boom"));

    assert_eq!(classify_pingora_error(&err), TransportFailure::Unknown);
}
