use crate::engine::codec::{UrlWrapper, decode};
use crate::engine::css::rewrite_css;
use crate::engine::error::RewriteError;
use crate::engine::origin::RewriteContext;
use crate::engine::redirect::rewrite_refresh;
use crate::engine::shim::{SHIM_MARKER, base_update, client_shim};
use lol_html::html_content::{ContentType, Element};
use lol_html::{HtmlRewriter, Settings, element, text};
use std::cell::{Cell, RefCell};

/// Attributes holding a single URL.
const URL_ATTRIBUTES: &[&str] = &[
    "href",
    "src",
    "action",
    "formaction",
    "data",
    "poster",
    "data-src",
];

/// Attributes holding a `srcset` candidate list.
const SRCSET_ATTRIBUTES: &[&str] = &["srcset", "data-srcset"];

const URL_SELECTOR: &str = "[href], [src], [action], [formaction], [data], [poster], [data-src]";
const SRCSET_SELECTOR: &str = "[srcset], [data-srcset]";

/// Rewrites an HTML document so every navigable or loadable reference goes
/// through the proxy, and injects the client shim.
///
/// The shim lands at the start of `<head>`, else at the start of `<body>`,
/// else at the start of the document. A page that already carries it gets no
/// second copy.
pub fn rewrite_markup(html: &[u8], ctx: &RewriteContext) -> Result<Vec<u8>, RewriteError> {
    let base = RefCell::new(ctx.target().clone());
    let shim = client_shim(ctx.origin(), ctx.target());
    let injected = Cell::new(has_shim(html));
    let style_text = RefCell::new(String::new());

    let inject = |el: &mut Element| {
        if !injected.replace(true) {
            el.prepend(&shim, ContentType::Html);
        }
    };

    let mut output = Vec::with_capacity(html.len() + shim.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("head", |el| {
                    inject(el);
                    Ok(())
                }),
                element!("body", |el| {
                    inject(el);
                    Ok(())
                }),
                element!("base[href]", |el| {
                    let href = el.get_attribute("href").unwrap_or_default();
                    let resolved = decode(href.trim(), ctx.origin())
                        .or_else(|| base.borrow().join(href.trim()).ok());
                    if let Some(next) = resolved.filter(|u| matches!(u.scheme(), "http" | "https"))
                    {
                        let wrapped = ctx.wrapper().wrap_or_keep(next.as_str());
                        el.set_attribute("href", &wrapped)?;
                        el.after(&base_update(&next), ContentType::Html);
                        *base.borrow_mut() = next;
                    }
                    Ok(())
                }),
                element!(URL_SELECTOR, |el| {
                    let current = base.borrow();
                    let wrapper = ctx.wrapper_with_base(&current);
                    for name in URL_ATTRIBUTES {
                        rewrite_attribute(el, name, |value| wrapper.wrap_or_keep(value))?;
                    }
                    Ok(())
                }),
                element!(SRCSET_SELECTOR, |el| {
                    let current = base.borrow();
                    let wrapper = ctx.wrapper_with_base(&current);
                    for name in SRCSET_ATTRIBUTES {
                        rewrite_attribute(el, name, |value| rewrite_srcset(value, &wrapper))?;
                    }
                    Ok(())
                }),
                element!("meta[http-equiv][content]", |el| {
                    let is_refresh = el
                        .get_attribute("http-equiv")
                        .is_some_and(|v| v.trim().eq_ignore_ascii_case("refresh"));
                    if is_refresh {
                        let current = base.borrow();
                        let wrapper = ctx.wrapper_with_base(&current);
                        rewrite_attribute(el, "content", |value| rewrite_refresh(value, &wrapper))?;
                    }
                    Ok(())
                }),
                element!("link[integrity], script[integrity]", |el| {
                    // Rewritten bodies no longer match the upstream digest.
                    el.remove_attribute("integrity");
                    Ok(())
                }),
                element!("[style]", |el| {
                    let current = base.borrow();
                    let wrapper = ctx.wrapper_with_base(&current);
                    rewrite_attribute(el, "style", |value| rewrite_css(value, &wrapper))?;
                    Ok(())
                }),
                text!("style", |chunk| {
                    style_text.borrow_mut().push_str(chunk.as_str());
                    if chunk.last_in_text_node() {
                        let css = style_text.take();
                        let current = base.borrow();
                        let rewritten = rewrite_css(&css, &ctx.wrapper_with_base(&current));
                        chunk.replace(&rewritten, ContentType::Html);
                    } else {
                        chunk.remove();
                    }
                    Ok(())
                }),
            ],
            ..Settings::new()
        },
        |bytes: &[u8]| output.extend_from_slice(bytes),
    );

    rewriter
        .write(html)
        .and_then(|_| rewriter.end())
        .map_err(|e| RewriteError::Markup {
            reason: e.to_string(),
        })?;

    if !injected.get() {
        let mut with_shim = shim.into_bytes();
        with_shim.extend_from_slice(&output);
        return Ok(with_shim);
    }
    Ok(output)
}

fn has_shim(html: &[u8]) -> bool {
    html.windows(SHIM_MARKER.len())
        .any(|window| window == SHIM_MARKER.as_bytes())
}

fn rewrite_attribute(
    el: &mut Element,
    name: &str,
    rewrite: impl Fn(&str) -> String,
) -> Result<(), lol_html::errors::AttributeNameError> {
    let Some(value) = el.get_attribute(name) else {
        return Ok(());
    };
    let rewritten = rewrite(&value);
    if rewritten != value {
        el.set_attribute(name, &rewritten)?;
    }
    Ok(())
}

/// Rewrites each URL of a `srcset` list, keeping descriptors and
/// separators byte for byte.
///
/// URLs are whitespace-delimited, so commas inside `data:` candidates do not
/// split them.
pub fn rewrite_srcset(value: &str, wrapper: &UrlWrapper<'_>) -> String {
    let bytes = value.as_bytes();
    let mut out = String::with_capacity(value.len() * 2);
    let mut i = 0;

    while i < bytes.len() {
        let sep_start = i;
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b',') {
            i += 1;
        }
        out.push_str(&value[sep_start..i]);
        if i >= bytes.len() {
            break;
        }

        let url_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let token = &value[url_start..i];
        let url = token.trim_end_matches(',');
        out.push_str(&wrapper.wrap_or_keep(url));
        if url.len() != token.len() {
            out.push_str(&token[url.len()..]);
            continue;
        }

        let descriptor_start = i;
        while i < bytes.len() && bytes[i] != b',' {
            i += 1;
        }
        out.push_str(&value[descriptor_start..i]);
    }

    out
}

