pub(crate) mod error_page;
mod landing;
pub(crate) mod preflight;

pub(crate) use error_page::ErrorPageHandler;
pub(crate) use landing::LandingHandler;
pub(crate) use preflight::PreflightHandler;

use crate::ctx::RequestCtx;
use bytes::Bytes;
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH,
};
use pingora::prelude::Session;
use pingora_http::ResponseHeader;

pub(crate) const REQUEST_ID_HEADER: &str = "x-request-id";

/// Headers every locally generated response carries.
pub(crate) fn decorate(resp: &mut ResponseHeader, ctx: &RequestCtx) -> pingora::Result<()> {
    resp.insert_header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")?;
    resp.insert_header(ACCESS_CONTROL_ALLOW_CREDENTIALS, "true")?;
    resp.insert_header(REQUEST_ID_HEADER, ctx.request_id.as_str())?;
    Ok(())
}

/// Writes a complete response and records its status on the context.
pub(crate) async fn send(
    session: &mut Session,
    ctx: &mut RequestCtx,
    mut resp: ResponseHeader,
    body: Option<Bytes>,
) -> pingora::Result<()> {
    decorate(&mut resp, ctx)?;
    let len = body.as_ref().map_or(0, Bytes::len);
    resp.insert_header(CONTENT_LENGTH, len.to_string())?;
    ctx.status = Some(resp.status);

    match body.filter(|b| !b.is_empty()) {
        Some(body) => {
            session.write_response_header(Box::new(resp), false).await?;
            session.write_response_body(Some(body), true).await?;
        }
        None => {
            session.write_response_header(Box::new(resp), true).await?;
        }
    }
    Ok(())
}
