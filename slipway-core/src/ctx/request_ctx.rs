use crate::ctx::{RequestId, ResponseRoute, Stage};
use crate::engine::cookie::read_recovery_cookie;
use crate::engine::{BodyDecoder, ResolvedVia, RewriteContext};
use bytes::BytesMut;
use http::header::{HOST, REFERER};
use http::{HeaderMap, Method, StatusCode, Uri};
use pingora::prelude::Session;
use pingora::protocols::l4::socket::SocketAddr as PingoraSocketAddr;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Instant;

/// Request context carried through the proxy pipeline.
#[derive(Debug)]
pub struct RequestCtx {
    /// Lifecycle flag to determine if the context has already been hydrated from a session.
    pub hydrated: bool,

    pub request_id: RequestId,

    pub started_at: Instant,

    /// Last pipeline stage reached.
    pub stage: Stage,

    pub method: Method,

    /// Raw path and query as received, e.g. `/https://site.example/a?b`.
    pub path_and_query: String,

    /// Authority the client addressed (`Host` or `:authority`).
    pub host: Option<String>,

    pub referer: Option<String>,

    /// Percent-encoded recovery cookie value, if the browser sent one.
    pub recovery_cookie: Option<String>,

    /// Remote IP of the TCP connection.
    pub peer_ip: IpAddr,

    /// Origin and destination, set once the target is resolved.
    pub rewrite: Option<RewriteContext>,

    pub resolved_via: Option<ResolvedVia>,

    pub route: ResponseRoute,

    /// Decoded upstream body collected for rewriting.
    pub body: BytesMut,

    /// Encoded bytes behind `body`, kept to forward as received if decoding fails.
    pub raw: BytesMut,

    /// Present while an encoded upstream body is being decoded.
    pub decoder: Option<BodyDecoder>,

    /// Status sent to the client.
    pub status: Option<StatusCode>,
}

impl Default for RequestCtx {
    fn default() -> Self {
        Self::empty()
    }
}

/// Hydration API
impl RequestCtx {
    pub fn empty() -> Self {
        Self {
            hydrated: false,
            request_id: RequestId::default(),
            started_at: Instant::now(),
            stage: Stage::ReceiveRequest,
            method: Method::GET,
            path_and_query: "/".to_string(),
            host: None,
            referer: None,
            recovery_cookie: None,
            peer_ip: Ipv4Addr::UNSPECIFIED.into(),
            rewrite: None,
            resolved_via: None,
            route: ResponseRoute::Passthrough,
            body: BytesMut::new(),
            raw: BytesMut::new(),
            decoder: None,
            status: None,
        }
    }

    /// Create a boundary to decouple session from logic.
    pub fn hydrate_from_session(&mut self, session: &Session) {
        let request_header = session.req_header();
        let peer_ip = match session.client_addr() {
            Some(PingoraSocketAddr::Inet(addr)) => addr.ip(),
            _ => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        self.hydrate(
            &request_header.uri,
            &request_header.method,
            &request_header.headers,
            peer_ip,
        );
    }

    pub(crate) fn hydrate(&mut self, uri: &Uri, method: &Method, headers: &HeaderMap, peer_ip: IpAddr) {
        debug_assert!(!self.hydrated, "Already hydrated, cannot hydrate again");

        self.method = method.clone();
        self.path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        self.host = headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| uri.authority().map(|a| a.as_str().to_string()));
        self.referer = headers
            .get(REFERER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.recovery_cookie = read_recovery_cookie(headers);
        self.peer_ip = peer_ip;
        self.hydrated = true;
    }
}

/// Accessors
impl RequestCtx {
    /// True for `GET /` (with an empty query), which serves the landing page.
    pub fn is_landing(&self) -> bool {
        self.path_and_query == "/" || self.path_and_query == "/?"
    }

    pub fn target(&self) -> Option<&url::Url> {
        self.rewrite.as_ref().map(RewriteContext::target)
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}
