use super::context;
use crate::engine::markup::{rewrite_markup, rewrite_srcset};
use crate::engine::shim::SHIM_MARKER;
use pretty_assertions::assert_eq;

fn rewrite(target: &str, html: &str) -> String {
    let ctx = context(target);
    String::from_utf8(rewrite_markup(html.as_bytes(), &ctx).unwrap()).unwrap()
}

/// Drops the injected shim so assertions can focus on the document itself.
fn without_shim(html: &str) -> String {
    let marker = format!("<script {SHIM_MARKER}>");
    match html.find(&marker) {
        Some(start) => {
            let end = start + html[start..].find("</script>").unwrap() + "</script>".len();
            format!("{}{}", &html[..start], &html[end..])
        }
        None => html.to_string(),
    }
}

//-----------------------------------------------------------------------------
// Attributes
//-----------------------------------------------------------------------------
#[test]
fn url_attributes_are_wrapped() {
    // Arrange
    let html = r#"<html><head></head><body><a href="/x">x</a><img src="logo.png"><form action="/post"></form></body></html>"#;

    // Act
    let out = without_shim(&rewrite("https://site.example/dir/page", html));

    // Assert
    assert_eq!(
        out,
        concat!(
            r#"<html><head></head><body>"#,
            r#"<a href="https://proxy.example/https://site.example/x">x</a>"#,
            r#"<img src="https://proxy.example/https://site.example/dir/logo.png">"#,
            r#"<form action="https://proxy.example/https://site.example/post"></form>"#,
            r#"</body></html>"#
        )
    );
}

#[test]
fn special_references_are_untouched() {
    let html = r##"<head></head><a href="#top">t</a><a href="javascript:void(0)">j</a><img src="data:image/gif;base64,R0lG">"##;

    let out = without_shim(&rewrite("https://site.example/", html));

    assert_eq!(out, html);
}

#[test]
fn srcset_candidates_are_wrapped_individually() {
    let ctx = context("https://site.example/gallery/");

    let out = rewrite_srcset("a.jpg 1x, /b.jpg 2x,data:image/png;base64,AA== 3x", &ctx.wrapper());

    assert_eq!(
        out,
        "https://proxy.example/https://site.example/gallery/a.jpg 1x, https://proxy.example/https://site.example/b.jpg 2x,data:image/png;base64,AA== 3x"
    );
}

#[test]
fn meta_refresh_is_rewritten() {
    let html = r#"<head><meta http-equiv="Refresh" content="0; url=/next"></head>"#;

    let out = without_shim(&rewrite("https://site.example/", html));

    assert_eq!(
        out,
        r#"<head><meta http-equiv="Refresh" content="0; url=https://proxy.example/https://site.example/next"></head>"#
    );
}

#[test]
fn integrity_is_removed_from_links() {
    let html = r#"<head><link rel="stylesheet" href="/s.css" integrity="sha384-abc"></head>"#;

    let out = without_shim(&rewrite("https://site.example/", html));

    assert_eq!(
        out,
        r#"<head><link rel="stylesheet" href="https://proxy.example/https://site.example/s.css"></head>"#
    );
}

#[test]
fn base_href_changes_resolution() {
    // Arrange
    let html = r#"<head><base href="https://cdn.example/v2/"></head><body><img src="a.png"></body>"#;

    // Act
    let out = without_shim(&rewrite("https://site.example/page", html));

    // Assert
    assert!(out.contains(r#"<base href="https://proxy.example/https://cdn.example/v2/">"#));
    assert!(out.contains("setBase(\"https://cdn.example/v2/\")"));
    assert!(out.contains(r#"<img src="https://proxy.example/https://cdn.example/v2/a.png">"#));
}

#[test]
fn inline_styles_are_rewritten() {
    let html = r#"<head><style>body{background:url(/bg.png)}</style></head><div style="background:url('i.png')"></div>"#;

    let out = without_shim(&rewrite("https://site.example/", html));

    assert_eq!(
        out,
        r#"<head><style>body{background:url(https://proxy.example/https://site.example/bg.png)}</style></head><div style="background:url('https://proxy.example/https://site.example/i.png')"></div>"#
    );
}

//-----------------------------------------------------------------------------
// Shim placement
//-----------------------------------------------------------------------------
#[test]
fn shim_is_first_child_of_head() {
    let out = rewrite("https://site.example/", "<html><head><title>t</title></head></html>");

    assert!(out.starts_with(&format!("<html><head><script {SHIM_MARKER}>")));
    assert_eq!(out.matches(SHIM_MARKER).count(), 1);
}

#[test]
fn shim_falls_back_to_body() {
    let out = rewrite("https://site.example/", "<body><p>hi</p></body>");

    assert!(out.starts_with(&format!("<body><script {SHIM_MARKER}>")));
}

#[test]
fn shim_falls_back_to_document_start() {
    let out = rewrite("https://site.example/", "<p>fragment</p>");

    assert!(out.starts_with(&format!("<script {SHIM_MARKER}>")));
    assert!(out.ends_with("<p>fragment</p>"));
}

#[test]
fn rewriting_twice_changes_nothing() {
    let html = r#"<head></head><a href="/x">x</a>"#;
    let once = without_shim(&rewrite("https://site.example/", html));

    let twice = without_shim(&rewrite("https://site.example/", &once));

    assert_eq!(once, twice);
}

#[test]
fn page_with_a_shim_does_not_get_a_second_one() {
    // Arrange
    let once = rewrite(
        "https://site.example/",
        r#"<html><head><title>t</title></head><body><a href="/x">x</a></body></html>"#,
    );

    // Act
    let twice = rewrite("https://site.example/", &once);

    // Assert
    assert_eq!(twice.matches(SHIM_MARKER).count(), 1);
    assert_eq!(twice, once);
}
