use super::context;
use crate::engine::css::rewrite_css;
use pretty_assertions::assert_eq;

#[test]
fn url_functions_in_every_quoting_style() {
    // Arrange
    let ctx = context("https://site.example/css/main.css");
    let css = r#"a{background:url(img/a.png)} b{background:URL( "/b.png" )} c{background:url('//cdn.example/c.png')}"#;

    // Act
    let rewritten = rewrite_css(css, &ctx.wrapper());

    // Assert
    assert_eq!(
        rewritten,
        concat!(
            "a{background:url(https://proxy.example/https://site.example/css/img/a.png)} ",
            "b{background:URL( \"https://proxy.example/https://site.example/b.png\" )} ",
            "c{background:url('https://proxy.example/https://cdn.example/c.png')}"
        )
    );
}

#[test]
fn string_imports_are_rewritten() {
    let ctx = context("https://site.example/css/main.css");

    let rewritten = rewrite_css("@import \"reset.css\";\n@import url(theme.css);", &ctx.wrapper());

    assert_eq!(
        rewritten,
        "@import \"https://proxy.example/https://site.example/css/reset.css\";\n@import url(https://proxy.example/https://site.example/css/theme.css);"
    );
}

#[test]
fn data_uris_and_unterminated_functions_are_untouched() {
    let ctx = context("https://site.example/");
    let css = "a{background:url(data:image/svg+xml;utf8,<svg/>)} b{background:url(";

    assert_eq!(rewrite_css(css, &ctx.wrapper()), css);
}
