use crate::ctx::RequestCtx;
use crate::proxy::handlers::send;
use http::header::{
    HeaderName, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_MAX_AGE,
    ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
};
use http::{HeaderMap, StatusCode};
use pingora::prelude::Session;
use pingora_http::ResponseHeader;

/// Seconds browsers may cache a preflight answer.
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Answers every `OPTIONS` request locally; preflights never reach the
/// destination.
pub(crate) struct PreflightHandler;

impl PreflightHandler {
    pub(crate) async fn handle(
        &self,
        session: &mut Session,
        ctx: &mut RequestCtx,
    ) -> pingora::Result<bool> {
        let resp = preflight_response(&session.req_header().headers)?;
        send(session, ctx, resp, None).await?;
        Ok(true)
    }
}

/// Echoes the requested method and headers, falling back to `*`.
pub(crate) fn preflight_response(request: &HeaderMap) -> pingora::Result<ResponseHeader> {
    let echo = |name: HeaderName| {
        request
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("*")
            .to_string()
    };

    let mut resp = ResponseHeader::build(StatusCode::NO_CONTENT, Some(6))?;
    resp.insert_header(ACCESS_CONTROL_ALLOW_METHODS, echo(ACCESS_CONTROL_REQUEST_METHOD))?;
    resp.insert_header(ACCESS_CONTROL_ALLOW_HEADERS, echo(ACCESS_CONTROL_REQUEST_HEADERS))?;
    resp.insert_header(ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE)?;
    Ok(resp)
}
