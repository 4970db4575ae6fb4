use crate::ctx::RequestCtx;
use crate::proxy::handlers::send;
use bytes::Bytes;
use http::StatusCode;
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use pingora::prelude::Session;
use pingora_http::ResponseHeader;

/// Plain-text error answers for requests the proxy cannot serve.
pub(crate) struct ErrorPageHandler;

impl ErrorPageHandler {
    pub(crate) async fn handle(
        &self,
        session: &mut Session,
        ctx: &mut RequestCtx,
        status: StatusCode,
        message: &str,
    ) -> pingora::Result<()> {
        let (resp, body) = error_response(status, message)?;
        send(session, ctx, resp, Some(body)).await
    }
}

pub(crate) fn error_response(
    status: StatusCode,
    message: &str,
) -> pingora::Result<(ResponseHeader, Bytes)> {
    let reason = status.canonical_reason().unwrap_or("Error");
    let body = Bytes::from(format!("{} {reason}: {message}\n", status.as_u16()));

    let mut resp = ResponseHeader::build(status, Some(6))?;
    resp.insert_header(CONTENT_TYPE, "text/plain; charset=utf-8")?;
    resp.insert_header(CACHE_CONTROL, "no-store")?;
    Ok((resp, body))
}
