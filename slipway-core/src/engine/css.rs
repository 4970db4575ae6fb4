use crate::engine::codec::UrlWrapper;

/// Rewrites `url(...)` references and string-form `@import` rules.
///
/// Works on stylesheets, `<style>` blocks and `style=""` attributes alike.
/// Quoting and surrounding whitespace are kept as found.
pub fn rewrite_css(text: &str, wrapper: &UrlWrapper<'_>) -> String {
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len() + 64);
    let mut copied = 0;
    let mut cursor = 0;

    while let Some(span) = next_reference(text, &lower, cursor) {
        out.push_str(&text[copied..span.start]);
        out.push_str(&wrapper.wrap_or_keep(&text[span.start..span.end]));
        copied = span.end;
        cursor = span.end;
    }

    out.push_str(&text[copied..]);
    out
}

struct Span {
    start: usize,
    end: usize,
}

/// Finds the next URL value at or after `from`.
fn next_reference(text: &str, lower: &str, from: usize) -> Option<Span> {
    let mut cursor = from;
    loop {
        let url_at = lower[cursor..].find("url(").map(|i| cursor + i);
        let import_at = lower[cursor..].find("@import").map(|i| cursor + i);

        let (at, is_import) = match (url_at, import_at) {
            (None, None) => return None,
            (Some(u), Some(i)) if i < u => (i, true),
            (Some(u), _) => (u, false),
            (None, Some(i)) => (i, true),
        };

        let found = if is_import {
            import_string(text, at + "@import".len())
        } else {
            url_function(text, at + "url(".len())
        };

        match found {
            Some(span) => return Some(span),
            None => cursor = at + 1,
        }
    }
}

/// Value of `url(` starting at `open` (just past the parenthesis).
fn url_function(text: &str, open: usize) -> Option<Span> {
    let start = skip_whitespace(text, open);
    match text[start..].chars().next()? {
        q @ ('"' | '\'') => {
            let inner = start + 1;
            let end = inner + text[inner..].find(q)?;
            Some(Span { start: inner, end })
        }
        _ => {
            let close = start + text[start..].find(')')?;
            let end = start + text[start..close].trim_end().len();
            (end > start).then_some(Span { start, end })
        }
    }
}

/// Value of `@import "x"`; the `@import url(x)` form is left to
/// [`url_function`].
fn import_string(text: &str, after: usize) -> Option<Span> {
    let start = skip_whitespace(text, after);
    let quote = text[start..].chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = start + 1;
    let end = inner + text[inner..].find(quote)?;
    Some(Span { start: inner, end })
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    from + (text[from..].len() - text[from..].trim_start().len())
}
