use crate::engine::codec::UrlWrapper;
use http::StatusCode;

/// True for statuses that send the browser elsewhere via `Location`.
///
/// `304 Not Modified` is a cache answer, not a redirect.
pub fn is_redirect(status: StatusCode) -> bool {
    status.is_redirection() && status != StatusCode::NOT_MODIFIED
}

/// Rewrites a `Location` value so the browser follows it through the proxy.
///
/// The value is resolved against the request's target. Anything that fails
/// to parse is passed through untouched.
pub fn rewrite_location(location: &str, wrapper: &UrlWrapper<'_>) -> String {
    wrapper.wrap_or_keep(location)
}

/// Rewrites the URL in a refresh directive such as `5; url=/next`.
///
/// Used for both the `Refresh` header and `<meta http-equiv="refresh">`.
/// Quotes around the URL are preserved.
pub fn rewrite_refresh(directive: &str, wrapper: &UrlWrapper<'_>) -> String {
    let lower = directive.to_ascii_lowercase();
    let Some(found) = lower.find("url") else {
        return directive.to_string();
    };

    let after_key = &lower[found + 3..];
    let Some(eq) = after_key.find('=') else {
        return directive.to_string();
    };
    if !after_key[..eq].trim().is_empty() {
        return directive.to_string();
    }

    let mut start = found + 3 + eq + 1;
    start += directive[start..].len() - directive[start..].trim_start().len();

    let quote = directive[start..]
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"');
    let (value_start, value_end) = match quote {
        Some(q) => {
            let inner = start + 1;
            let end = directive[inner..]
                .find(q)
                .map_or(directive.len(), |i| inner + i);
            (inner, end)
        }
        None => (start, directive.trim_end().len().max(start)),
    };

    let url = &directive[value_start..value_end];
    if url.trim().is_empty() {
        return directive.to_string();
    }

    format!(
        "{}{}{}",
        &directive[..value_start],
        wrapper.wrap_or_keep(url.trim()),
        &directive[value_end..]
    )
}
