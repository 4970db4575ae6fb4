use http::StatusCode;

/// Coarse cause of a failed proxy attempt, logged with the access line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransportFailure {
    Connect,
    Tls,
    Protocol,
    Timeout,
    Reset,
    /// The client went away; nothing can be sent.
    Downstream,
    Unknown,
}

impl TransportFailure {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            TransportFailure::Connect => "connect",
            TransportFailure::Tls => "tls",
            TransportFailure::Protocol => "protocol",
            TransportFailure::Timeout => "timeout",
            TransportFailure::Reset => "reset",
            TransportFailure::Downstream => "downstream",
            TransportFailure::Unknown => "unknown",
        }
    }

    /// Status reported to the client, or `None` when the client is gone.
    pub(crate) fn status(&self) -> Option<StatusCode> {
        match self {
            TransportFailure::Downstream => None,
            _ => Some(StatusCode::BAD_GATEWAY),
        }
    }
}

pub(crate) fn classify_pingora_error(err: &pingora::Error) -> TransportFailure {
    use pingora::{ErrorSource, ErrorType::*};

    if err.esource() == &ErrorSource::Downstream {
        return match err.etype() {
            ReadError | WriteError | ConnectionClosed | ReadTimedout | WriteTimedout => {
                TransportFailure::Downstream
            }
            _ => TransportFailure::Unknown,
        };
    }

    match err.etype() {
        // Connect phase.
        ConnectTimedout | ConnectRefused | ConnectNoRoute | ConnectProxyFailure | ConnectError => {
            TransportFailure::Connect
        }

        // TLS / handshake.
        TLSHandshakeFailure | TLSHandshakeTimedout | TLSWantX509Lookup | InvalidCert
        | HandshakeError => TransportFailure::Tls,

        // Protocol.
        InvalidHTTPHeader | H1Error | H2Error | InvalidH2 | H2Downgrade => {
            TransportFailure::Protocol
        }

        // Established connection IO.
        ReadTimedout | WriteTimedout => TransportFailure::Timeout,

        ReadError | WriteError | ConnectionClosed => TransportFailure::Reset,

        _ => TransportFailure::Unknown,
    }
}
