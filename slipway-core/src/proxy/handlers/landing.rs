use crate::ctx::RequestCtx;
use crate::proxy::handlers::send;
use bytes::Bytes;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use pingora::prelude::Session;
use pingora::{Custom, Error};
use pingora_http::ResponseHeader;
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "assets/landing/"]
struct LandingAssets;

/// Serves the page shown for `/`: a form that navigates to `/<url>`.
pub(crate) struct LandingHandler;

impl LandingHandler {
    pub(crate) async fn handle(
        &self,
        session: &mut Session,
        ctx: &mut RequestCtx,
    ) -> pingora::Result<bool> {
        let page = LandingAssets::get("index.html")
            .ok_or_else(|| Error::new(Custom("landing page asset missing")))?;

        let mut resp = ResponseHeader::build(StatusCode::OK, Some(4))?;
        resp.insert_header(CONTENT_TYPE, "text/html; charset=utf-8")?;

        let body = if ctx.method == http::Method::HEAD {
            None
        } else {
            Some(Bytes::copy_from_slice(&page.data))
        };
        send(session, ctx, resp, body).await?;
        Ok(true)
    }
}
