use crate::engine::codec::decode;
use crate::engine::cookie::{rewrite_set_cookie, strip_recovery_cookie};
use crate::engine::origin::RewriteContext;
use crate::engine::redirect::{rewrite_location, rewrite_refresh};
use http::header::{
    ACCEPT_ENCODING, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN, COOKIE, HOST,
    HeaderName, HeaderValue, LOCATION, ORIGIN, REFERER, REFRESH, SET_COOKIE, USER_AGENT,
};
use http::{HeaderMap, Method};

/// Encodings the proxy can decode before rewriting a body.
pub const UPSTREAM_ACCEPT_ENCODING: &str = "gzip, deflate, br";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Request headers that describe the client, the proxy hop or a hosting
/// platform. None of them make sense at the destination.
const REQUEST_DROP: &[&str] = &[
    "host",
    "origin",
    "referer",
    "forwarded",
    "via",
    "x-real-ip",
    "true-client-ip",
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authorization",
    "te",
    "trailer",
    "upgrade",
    "accept-encoding",
];

const REQUEST_DROP_PREFIXES: &[&str] = &["x-forwarded-", "cf-", "x-vercel-", "x-nf-", "x-amzn-"];

/// Response headers that would stop proxied pages from loading or that only
/// make sense for the destination origin.
const RESPONSE_DROP: &[&str] = &[
    "content-security-policy",
    "content-security-policy-report-only",
    "x-frame-options",
    "x-content-type-options",
    "x-xss-protection",
    "cross-origin-opener-policy",
    "cross-origin-embedder-policy",
    "cross-origin-resource-policy",
    "strict-transport-security",
    "alt-svc",
    "clear-site-data",
    "access-control-allow-origin",
    "access-control-allow-credentials",
    "connection",
    "keep-alive",
];

/// Static description of what crosses the proxy in either direction.
#[derive(Debug, Clone)]
pub struct HeaderPolicy {
    /// Forward the browser's cookies to the destination.
    pub forward_cookies: bool,
    /// Send `Origin` even for GET/HEAD/OPTIONS.
    pub spoof_origin_on_safe_methods: bool,
    /// Used when the client sends no `User-Agent`.
    pub default_user_agent: HeaderValue,
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        Self {
            forward_cookies: true,
            spoof_origin_on_safe_methods: false,
            default_user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
        }
    }
}

impl HeaderPolicy {
    fn drops_request(name: &HeaderName) -> bool {
        let name = name.as_str();
        REQUEST_DROP.contains(&name) || REQUEST_DROP_PREFIXES.iter().any(|p| name.starts_with(p))
    }

    fn drops_response(name: &HeaderName) -> bool {
        RESPONSE_DROP.contains(&name.as_str())
    }
}

/// Applies a [`HeaderPolicy`] for one request.
pub struct HeaderTransformer<'a> {
    policy: &'a HeaderPolicy,
    ctx: &'a RewriteContext,
}

impl<'a> HeaderTransformer<'a> {
    pub fn new(policy: &'a HeaderPolicy, ctx: &'a RewriteContext) -> Self {
        Self { policy, ctx }
    }

    /// Builds the header set sent to the destination.
    pub fn request_headers(&self, inbound: &HeaderMap, method: &Method) -> HeaderMap {
        let mut out = HeaderMap::with_capacity(inbound.len() + 4);

        for (name, value) in inbound {
            if HeaderPolicy::drops_request(name) {
                continue;
            }
            if name == COOKIE {
                if !self.policy.forward_cookies {
                    continue;
                }
                let Some(kept) = value.to_str().ok().and_then(strip_recovery_cookie) else {
                    continue;
                };
                if let Ok(kept) = HeaderValue::from_str(&kept) {
                    out.append(COOKIE, kept);
                }
                continue;
            }
            out.append(name.clone(), value.clone());
        }

        let target = self.ctx.target();
        if let Ok(host) = HeaderValue::from_str(&host_header(target)) {
            out.insert(HOST, host);
        }

        let target_origin = target.origin().ascii_serialization();
        if !is_safe(method) || self.policy.spoof_origin_on_safe_methods {
            if let Ok(origin) = HeaderValue::from_str(&target_origin) {
                out.insert(ORIGIN, origin);
            }
        }

        let referer = inbound
            .get(REFERER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| decode(v, self.ctx.origin()))
            .map(|url| url.to_string())
            .unwrap_or_else(|| format!("{target_origin}/"));
        if let Ok(referer) = HeaderValue::from_str(&referer) {
            out.insert(REFERER, referer);
        }

        let has_agent = inbound
            .get(USER_AGENT)
            .is_some_and(|v| !v.as_bytes().is_empty());
        if !has_agent {
            out.insert(USER_AGENT, self.policy.default_user_agent.clone());
        }

        out.insert(
            ACCEPT_ENCODING,
            HeaderValue::from_static(UPSTREAM_ACCEPT_ENCODING),
        );

        out
    }

    /// Builds the header set returned to the browser.
    ///
    /// Body framing headers are left to the caller, which knows whether the
    /// body will be rewritten.
    pub fn response_headers(&self, upstream: &HeaderMap) -> HeaderMap {
        let wrapper = self.ctx.wrapper();
        let mut out = HeaderMap::with_capacity(upstream.len() + 2);

        for (name, value) in upstream {
            if HeaderPolicy::drops_response(name) {
                continue;
            }

            let rewritten = match value.to_str() {
                Ok(text) if name == SET_COOKIE => Some(rewrite_set_cookie(text, self.ctx.origin())),
                Ok(text) if name == LOCATION => Some(rewrite_location(text, &wrapper)),
                Ok(text) if name == REFRESH => Some(rewrite_refresh(text, &wrapper)),
                _ => None,
            };

            match rewritten.map(|text| HeaderValue::from_str(&text)) {
                Some(Ok(value)) => out.append(name.clone(), value),
                _ => out.append(name.clone(), value.clone()),
            };
        }

        out.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        out.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );

        out
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// `host[:port]` as the destination expects it in `Host`.
pub fn host_header(target: &url::Url) -> String {
    let host = target.host_str().unwrap_or_default();
    match target.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
