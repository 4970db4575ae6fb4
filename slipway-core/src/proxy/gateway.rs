use crate::ctx::{RequestCtx, ResponseRoute, Stage};
use crate::engine::cookie::recovery_cookie;
use crate::engine::{
    ContentKind, HeaderTransformer, ResolveError, ResolveInput, RewriteContext, TargetResolver,
};
use crate::proxy::error_classification::classify_pingora_error;
use crate::proxy::gateway_ctx::GatewayCtx;
use crate::proxy::handlers::{
    ErrorPageHandler, LandingHandler, PreflightHandler, REQUEST_ID_HEADER,
};
use crate::proxy::pipeline::{
    body_decoder, filter_body, plan_response, replace_request_headers, replace_response_headers,
    upstream_uri,
};
use crate::server::ProxyRuntime;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, SET_COOKIE, TRANSFER_ENCODING};
use http::{Method, StatusCode};
use pingora::prelude::*;
use pingora::proxy::FailToProxy;
use pingora_http::{RequestHeader, ResponseHeader};
use std::sync::Arc;
use std::time::Duration;

/// Forward proxy that serves any destination under `/<absolute-url>` and
/// rewrites what comes back so the browser stays on the proxy.
pub struct SlipwayGateway {
    gw_ctx: GatewayCtx,

    // Handlers
    preflight_handler: PreflightHandler,
    landing_handler: LandingHandler,
    error_handler: ErrorPageHandler,
}

impl SlipwayGateway {
    pub fn new(runtime: Arc<ProxyRuntime>) -> Self {
        Self {
            gw_ctx: GatewayCtx::new(runtime),
            preflight_handler: PreflightHandler,
            landing_handler: LandingHandler,
            error_handler: ErrorPageHandler,
        }
    }
}

/// Pingora hook execution order in ProxyHttp...
///
/// 1. new_ctx()
///    - Allocate empty RequestCtx
///
/// 2. request_filter()
///    - Hydrate ctx from Session
///    - OPTIONS preflights and the landing page end here
///    - Resolve the destination, or answer 400
///
/// 3. upstream_peer()
///    - Look up the destination host, construct HttpPeer (TLS for https)
///
/// 4. upstream_request_filter()
///    - Origin-form URI, outbound header policy
///
/// 5. [Pingora upstream I/O]
///    - Connect, TLS, send request, receive response
///    - Failures land in fail_to_connect / error_while_proxy, then fail_to_proxy (502)
///
/// 6. response_filter()
///    - Inbound header policy, Location/Set-Cookie/Refresh rewriting
///    - Decide the body route (redirect, rewrite, passthrough)
///
/// 7. response_body_filter()
///    - Buffer rewritable bodies and rewrite them at end of stream
///
/// 8. logging()   /// ALWAYS LAST
///    - Access log line with the last stage reached
#[async_trait]
impl ProxyHttp for SlipwayGateway {
    type CTX = RequestCtx;

    fn new_ctx(&self) -> Self::CTX {
        RequestCtx::empty()
    }

    /// RECEIVE → (PREFLIGHT | LANDING | RESOLVE → (400 | PROXY))
    async fn request_filter(&self, session: &mut Session, ctx: &mut Self::CTX) -> Result<bool> {
        // The request ctx exists before now, but has no data.
        ctx.hydrate_from_session(session);

        if ctx.method == Method::OPTIONS {
            ctx.stage = Stage::Preflight;
            return self.preflight_handler.handle(session, ctx).await;
        }

        if ctx.is_landing() {
            ctx.stage = Stage::Landing;
            return self.landing_handler.handle(session, ctx).await;
        }

        ctx.stage = Stage::ResolveTarget;
        match self.resolve_target(ctx) {
            Ok(()) => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    target = ctx.target().map(|t| t.as_str()),
                    via = ctx.resolved_via.map(|v| v.as_str()),
                    "destination resolved"
                );
                Ok(false)
            }
            Err(err) => {
                ctx.stage = Stage::Fail400;
                tracing::info!(
                    request_id = %ctx.request_id,
                    path = %ctx.path_and_query,
                    error = %err,
                    "destination could not be resolved"
                );
                self.error_handler
                    .handle(session, ctx, StatusCode::BAD_REQUEST, &err.to_string())
                    .await?;
                Ok(true)
            }
        }
    }

    /// One peer per request; the destination host is looked up every time.
    async fn upstream_peer(
        &self,
        _session: &mut Session,
        ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        let runtime = self.gw_ctx.runtime();

        let target = ctx
            .target()
            .ok_or_else(|| Error::new(Custom("no destination resolved")))?;
        let host = match target.host() {
            Some(url::Host::Domain(domain)) => domain.to_string(),
            Some(url::Host::Ipv4(ip)) => ip.to_string(),
            Some(url::Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(Error::new(Custom("destination has no host"))),
        };
        let port = target
            .port_or_known_default()
            .ok_or_else(|| Error::new(Custom("destination has no port")))?;
        let use_tls = target.scheme() == "https";

        let addr = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|e| Error::because(ConnectNoRoute, format!("failed to resolve {host}"), e))?
            .next()
            .ok_or_else(|| Error::explain(ConnectNoRoute, format!("no address for {host}")))?;

        let mut peer = HttpPeer::new(addr, use_tls, host);
        peer.options.connection_timeout = Some(runtime.connect_timeout);
        peer.options.read_timeout = Some(runtime.read_timeout);

        Ok(Box::new(peer))
    }

    async fn upstream_request_filter(
        &self,
        _session: &mut Session,
        upstream: &mut RequestHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        ctx.stage = Stage::TransformRequestHeaders;
        let runtime = self.gw_ctx.runtime();

        let rewrite = ctx
            .rewrite
            .as_ref()
            .ok_or_else(|| Error::new(Custom("no destination resolved")))?;

        let uri = upstream_uri(rewrite.target()).map_err(|e| {
            Error::because(InvalidHTTPHeader, "destination is not a valid request target", e)
        })?;
        upstream.set_uri(uri);

        let headers = HeaderTransformer::new(&runtime.header_policy, rewrite)
            .request_headers(&upstream.headers, &ctx.method);
        replace_request_headers(upstream, headers)?;

        ctx.stage = Stage::Dispatch;
        Ok(())
    }

    async fn response_filter(
        &self,
        _session: &mut Session,
        upstream: &mut ResponseHeader,
        ctx: &mut Self::CTX,
    ) -> Result<()> {
        let Some(rewrite) = ctx.rewrite.as_ref() else {
            return Ok(());
        };
        let runtime = self.gw_ctx.runtime();

        let route = plan_response(
            upstream.status,
            &upstream.headers,
            rewrite.target(),
            runtime.max_rewrite_bytes,
        );
        let is_markup = matches!(
            route,
            ResponseRoute::Rewrite {
                kind: ContentKind::Markup,
                ..
            }
        );
        let recovery = (runtime.recovery_cookie && is_markup).then(|| recovery_cookie(rewrite.target()));

        let headers = HeaderTransformer::new(&runtime.header_policy, rewrite)
            .response_headers(&upstream.headers);
        replace_response_headers(upstream, headers)?;
        upstream.insert_header(REQUEST_ID_HEADER, ctx.request_id.as_str())?;

        ctx.stage = Stage::TransformResponseHeaders;
        match route {
            ResponseRoute::Redirect => {
                upstream.remove_header(&TRANSFER_ENCODING);
                upstream.remove_header(&CONTENT_ENCODING);
                upstream.insert_header(CONTENT_LENGTH, "0")?;
                ctx.stage = Stage::EmitRedirect;
            }
            ResponseRoute::Rewrite { .. } => {
                // The rewritten length is unknown until the body is complete.
                upstream.remove_header(&CONTENT_LENGTH);
                upstream.remove_header(&CONTENT_ENCODING);
                if ctx.method != Method::HEAD {
                    upstream.insert_header(TRANSFER_ENCODING, "chunked")?;
                }
                if let Some(cookie) = recovery {
                    upstream.append_header(SET_COOKIE, cookie)?;
                }
                ctx.decoder = body_decoder(&ctx.method, route)
                    .map_err(|e| Error::because(InternalError, "no decoder for upstream body", e))?;
            }
            ResponseRoute::Passthrough | ResponseRoute::Decode { .. } => {}
        }

        ctx.route = route;
        ctx.status = Some(upstream.status);
        Ok(())
    }

    fn response_body_filter(
        &self,
        _session: &mut Session,
        body: &mut Option<Bytes>,
        end_of_stream: bool,
        ctx: &mut Self::CTX,
    ) -> Result<Option<Duration>>
    where
        Self::CTX: Send + Sync,
    {
        let limit = self.gw_ctx.runtime().max_rewrite_bytes;
        *body = filter_body(ctx, body.take(), end_of_stream, limit).map_err(|e| {
            tracing::warn!(
                request_id = %ctx.request_id,
                error = %e,
                "decoded body stream aborted"
            );
            Error::because(Custom("upstream body could not be decoded"), "decoding response body", e)
        })?;

        if end_of_stream && ctx.stage == Stage::TransformResponseHeaders {
            ctx.stage = Stage::EmitResponse;
        }
        Ok(None)
    }

    /// Connection failures are reported, never retried.
    fn fail_to_connect(
        &self,
        _session: &mut Session,
        _peer: &HttpPeer,
        _ctx: &mut Self::CTX,
        mut e: Box<Error>,
    ) -> Box<Error> {
        e.set_retry(false);
        e
    }

    fn error_while_proxy(
        &self,
        peer: &HttpPeer,
        _session: &mut Session,
        e: Box<Error>,
        _ctx: &mut Self::CTX,
        _client_reused: bool,
    ) -> Box<Error> {
        let mut e = e.more_context(format!("peer: {}", peer));
        e.set_retry(false);
        e
    }

    async fn fail_to_proxy(
        &self,
        session: &mut Session,
        e: &Error,
        ctx: &mut Self::CTX,
    ) -> FailToProxy
    where
        Self::CTX: Send + Sync,
    {
        let failure = classify_pingora_error(e);
        tracing::warn!(
            request_id = %ctx.request_id,
            target = ctx.target().map(|t| t.as_str()),
            stage = ctx.stage.as_str(),
            failure = failure.as_str(),
            error = %e,
            "proxying failed"
        );

        let Some(status) = failure.status() else {
            return FailToProxy {
                error_code: 0,
                can_reuse_downstream: false,
            };
        };

        // Nothing more can be written once a response has started.
        if ctx.status.is_some() || ctx.stage.is_terminal() {
            return FailToProxy {
                error_code: status.as_u16(),
                can_reuse_downstream: false,
            };
        }

        ctx.stage = Stage::Fail502;
        let message = format!("the destination could not be reached ({})", failure.as_str());
        if let Err(write_err) = self
            .error_handler
            .handle(session, ctx, status, &message)
            .await
        {
            tracing::debug!(error = %write_err, "failed to send error response");
        }

        FailToProxy {
            error_code: status.as_u16(),
            can_reuse_downstream: false,
        }
    }

    async fn logging(&self, session: &mut Session, e: Option<&Error>, ctx: &mut Self::CTX)
    where
        Self::CTX: Send + Sync,
    {
        let status = ctx
            .status
            .map(|s| s.as_u16())
            .or_else(|| session.response_written().map(|r| r.status.as_u16()))
            .unwrap_or(0);
        let failure = e.map(|err| classify_pingora_error(err).as_str());

        tracing::info!(
            event = "access",
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path_and_query,
            target = ctx.target().map(|t| t.as_str()),
            resolved_via = ctx.resolved_via.map(|v| v.as_str()),
            route = ctx.route.as_str(),
            stage = ctx.stage.as_str(),
            status,
            failure,
            peer_ip = %ctx.peer_ip,
            duration_ms = ctx.elapsed_ms() as u64,
            "request complete"
        );
    }
}

impl SlipwayGateway {
    /// Fills `ctx.rewrite` with the proxy origin and the destination.
    fn resolve_target(&self, ctx: &mut RequestCtx) -> std::result::Result<(), ResolveError> {
        let origin = self.gw_ctx.runtime().origin_for(ctx.host.as_deref())?;

        let input = ResolveInput {
            path_and_query: &ctx.path_and_query,
            referer: ctx.referer.as_deref(),
            recovery_cookie: ctx.recovery_cookie.as_deref(),
        };
        let resolved = TargetResolver::new(&origin).resolve(&input)?;

        ctx.resolved_via = Some(resolved.via);
        ctx.rewrite = Some(RewriteContext::new(origin, resolved.target));
        Ok(())
    }
}
