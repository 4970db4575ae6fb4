use crate::engine::error::RewriteError;
use crate::engine::origin::ProxyOrigin;
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use url::Url;

/// Reference prefixes that never leave the document and are never proxied.
const SKIPPED_PREFIXES: &[&str] = &[
    "data:",
    "blob:",
    "javascript:",
    "about:",
    "mailto:",
    "tel:",
    "#",
];

//-----------------------------------------------------------------------------
// Encode / decode
//-----------------------------------------------------------------------------

/// True when `candidate` already starts with `<origin>/`.
pub fn is_encoded(candidate: &str, origin: &ProxyOrigin) -> bool {
    candidate
        .strip_prefix(origin.as_str())
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Wraps an absolute target URL into the path form the proxy understands:
/// `<origin>/<target>`, with the target left unencoded.
///
/// Already wrapped values are returned unchanged.
pub fn encode(target: &str, origin: &ProxyOrigin) -> String {
    if is_encoded(target, origin) {
        return target.to_string();
    }
    format!("{}/{}", origin.as_str(), target)
}

/// Recovers the target URL from an encoded proxy URL.
///
/// Returns `None` when `encoded` does not belong to this proxy or carries no
/// absolute http(s) destination.
pub fn decode(encoded: &str, origin: &ProxyOrigin) -> Option<Url> {
    let rest = encoded.strip_prefix(origin.as_str())?.strip_prefix('/')?;
    let candidate = unwrap_embedded(rest)?;
    let url = Url::parse(&candidate).ok()?;
    if origin.matches(&url) {
        return None;
    }
    Some(url)
}

//-----------------------------------------------------------------------------
// Embedded target normalization
//-----------------------------------------------------------------------------

/// Normalizes the part of a path that follows the proxy origin into an
/// absolute `http(s)://` string, or `None` when it does not start with one.
///
/// Handles the three shapes browsers and scripts produce:
/// - a percent-encoded target (`https%3A%2F%2Fsite.example%2F`)
/// - a target whose `//` was collapsed to `/` by path normalization
/// - a target nested inside other encoded targets, of which the innermost wins
pub(crate) fn unwrap_embedded(raw: &str) -> Option<String> {
    let decoded = decode_if_escaped(raw);
    let normalized = normalize_scheme_separator(&decoded)?;
    Some(collapse_nested(&normalized))
}

fn decode_if_escaped(raw: &str) -> Cow<'_, str> {
    if starts_with_ignore_case(raw, "http%3a") || starts_with_ignore_case(raw, "https%3a") {
        percent_decode_str(raw).decode_utf8_lossy()
    } else {
        Cow::Borrowed(raw)
    }
}

/// Rewrites `scheme:/x` and `scheme:x` into `scheme://x`.
fn normalize_scheme_separator(raw: &str) -> Option<String> {
    let scheme_len = scheme_prefix_len(raw)?;
    let (scheme, rest) = raw.split_at(scheme_len);
    let rest = rest.trim_start_matches('/');
    Some(format!("{}//{}", scheme.to_ascii_lowercase(), rest))
}

/// Length of a leading `http:` or `https:` (including the colon).
fn scheme_prefix_len(raw: &str) -> Option<usize> {
    if starts_with_ignore_case(raw, "https:") {
        Some("https:".len())
    } else if starts_with_ignore_case(raw, "http:") {
        Some("http:".len())
    } else {
        None
    }
}

/// Keeps only the last `http(s):/` that begins a path segment.
///
/// The query string is excluded from the search so that a destination such
/// as `https://site.example/login?next=https://other.example/` survives.
fn collapse_nested(url: &str) -> String {
    let head_end = url.find(['?', '#']).unwrap_or(url.len());
    let head = &url[..head_end];
    let lower = head.to_ascii_lowercase();

    let mut innermost = None;
    // Skip the scheme of the outer URL itself.
    let mut cursor = scheme_prefix_len(head).unwrap_or(0);
    while let Some(offset) = lower[cursor..].find("http") {
        let at = cursor + offset;
        let at_boundary = lower.as_bytes().get(at.wrapping_sub(1)) == Some(&b'/');
        if at_boundary
            && (lower[at..].starts_with("http:/") || lower[at..].starts_with("https:/"))
        {
            innermost = Some(at);
        }
        cursor = at + 4;
    }

    match innermost {
        Some(at) => {
            normalize_scheme_separator(&url[at..]).unwrap_or_else(|| url[at..].to_string())
        }
        None => url.to_string(),
    }
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

//-----------------------------------------------------------------------------
// Wrap
//-----------------------------------------------------------------------------

/// Resolves URL references found in content and turns them into encoded
/// proxy URLs.
#[derive(Debug, Clone, Copy)]
pub struct UrlWrapper<'a> {
    origin: &'a ProxyOrigin,
    base: &'a Url,
}

impl<'a> UrlWrapper<'a> {
    pub fn new(origin: &'a ProxyOrigin, base: &'a Url) -> Self {
        Self { origin, base }
    }

    /// Resolves `reference` against the base and encodes the result.
    ///
    /// `Ok(None)` means the reference is intentionally left alone: empty,
    /// a special scheme, a fragment, non-http(s), or already proxied.
    pub fn wrap(&self, reference: &str) -> Result<Option<String>, RewriteError> {
        let trimmed = reference.trim();
        if trimmed.is_empty() || is_skipped(trimmed) || is_encoded(trimmed, self.origin) {
            return Ok(None);
        }

        let resolved = self
            .base
            .join(trimmed)
            .map_err(|_| RewriteError::UnparseableReference {
                value: trimmed.to_string(),
            })?;

        if !matches!(resolved.scheme(), "http" | "https") || self.origin.matches(&resolved) {
            return Ok(None);
        }

        Ok(Some(encode(resolved.as_str(), self.origin)))
    }

    /// Like [`wrap`](Self::wrap), but returns the original text whenever no
    /// rewrite applies.
    pub fn wrap_or_keep(&self, reference: &str) -> String {
        match self.wrap(reference) {
            Ok(Some(wrapped)) => wrapped,
            Ok(None) => reference.to_string(),
            Err(e) => {
                tracing::trace!(error = %e, "leaving reference unchanged");
                reference.to_string()
            }
        }
    }
}

fn is_skipped(reference: &str) -> bool {
    SKIPPED_PREFIXES
        .iter()
        .any(|prefix| starts_with_ignore_case(reference, prefix))
}
