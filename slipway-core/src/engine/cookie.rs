use crate::engine::origin::ProxyOrigin;
use http::HeaderMap;
use http::header::COOKIE;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

/// Cookie carrying the origin of the last proxied document.
pub const RECOVERY_COOKIE: &str = "__proxy_target__";

/// Lifetime of the recovery cookie, in seconds.
const RECOVERY_COOKIE_MAX_AGE: u32 = 3600;

/// Rewrites an upstream `Set-Cookie` so the browser stores it for the proxy.
///
/// `Domain` is dropped and `Path` is forced to `/`. When the proxy itself is
/// served over plain http, `Secure` and `SameSite=None` are dropped too,
/// otherwise the browser would discard the cookie.
pub fn rewrite_set_cookie(value: &str, origin: &ProxyOrigin) -> String {
    let mut parts = value.split(';');
    let pair = parts.next().unwrap_or_default().trim();

    let mut out = vec![pair.to_string()];
    let mut saw_path = false;
    for attribute in parts.map(str::trim).filter(|a| !a.is_empty()) {
        let (name, attr_value) = match attribute.split_once('=') {
            Some((n, v)) => (n.trim(), Some(v.trim())),
            None => (attribute, None),
        };

        if name.eq_ignore_ascii_case("domain") {
            continue;
        }
        if name.eq_ignore_ascii_case("path") {
            if !saw_path {
                out.push("Path=/".to_string());
                saw_path = true;
            }
            continue;
        }
        if !origin.is_secure() {
            if name.eq_ignore_ascii_case("secure") {
                continue;
            }
            if name.eq_ignore_ascii_case("samesite")
                && attr_value.is_some_and(|v| v.eq_ignore_ascii_case("none"))
            {
                continue;
            }
        }
        out.push(attribute.to_string());
    }

    if !saw_path {
        out.push("Path=/".to_string());
    }
    out.join("; ")
}

/// `Set-Cookie` value recording the origin of `target` for later recovery of
/// root-relative requests that arrive without a usable `Referer`.
pub fn recovery_cookie(target: &Url) -> String {
    let origin = target.origin().ascii_serialization();
    format!(
        "{RECOVERY_COOKIE}={}; Path=/; Max-Age={RECOVERY_COOKIE_MAX_AGE}; SameSite=Lax",
        utf8_percent_encode(&origin, NON_ALPHANUMERIC)
    )
}

/// Finds the recovery cookie among all `Cookie` headers of a request.
pub fn read_recovery_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == RECOVERY_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Removes the recovery cookie from a `Cookie` header value.
///
/// Returns `None` when nothing else is left to forward.
pub fn strip_recovery_cookie(value: &str) -> Option<String> {
    let kept: Vec<&str> = value
        .split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            pair.split_once('=')
                .map_or(*pair, |(name, _)| name.trim())
                != RECOVERY_COOKIE
        })
        .collect();

    (!kept.is_empty()).then(|| kept.join("; "))
}
