use super::context;
use crate::engine::playlist::{is_playlist, rewrite_playlist};
use pretty_assertions::assert_eq;

#[test]
fn uri_lines_are_wrapped_and_tags_kept() {
    // Arrange
    let ctx = context("https://cdn.example/v/index.m3u8");
    let playlist = "#EXTM3U\n#EXTINF:10,\nseg1.ts\n";

    // Act
    let rewritten = rewrite_playlist(playlist, &ctx.wrapper());

    // Assert
    assert_eq!(
        rewritten,
        "#EXTM3U\n#EXTINF:10,\nhttps://proxy.example/https://cdn.example/v/seg1.ts\n"
    );
}

#[test]
fn crlf_line_endings_survive() {
    let ctx = context("https://cdn.example/v/index.m3u8");
    let playlist = "#EXTM3U\r\n\r\n720p/index.m3u8\r\n";

    let rewritten = rewrite_playlist(playlist, &ctx.wrapper());

    assert_eq!(
        rewritten,
        "#EXTM3U\r\n\r\nhttps://proxy.example/https://cdn.example/v/720p/index.m3u8\r\n"
    );
}

#[test]
fn absolute_and_proxied_lines() {
    let ctx = context("https://cdn.example/v/index.m3u8");
    let playlist = "https://other.example/a.ts\nhttps://proxy.example/https://cdn.example/b.ts";

    let rewritten = rewrite_playlist(playlist, &ctx.wrapper());

    assert_eq!(
        rewritten,
        "https://proxy.example/https://other.example/a.ts\nhttps://proxy.example/https://cdn.example/b.ts"
    );
}

#[test]
fn unresolvable_line_is_left_alone() {
    let ctx = context("https://cdn.example/v/index.m3u8");
    let playlist = "#EXTM3U\nhttp://[::1\n";

    assert_eq!(rewrite_playlist(playlist, &ctx.wrapper()), playlist);
}

#[test]
fn playlist_detection() {
    assert!(is_playlist(Some("application/x-mpegURL"), "/live"));
    assert!(is_playlist(None, "/live/index.m3u8"));
    assert!(!is_playlist(Some("video/mp2t"), "/seg1.ts"));
}
