use crate::ctx::{RequestCtx, Stage};
use http::Method;
use pingora::prelude::Session;
use pretty_assertions::assert_eq;
use tokio::io::{AsyncWriteExt, duplex};

//-----------------------------------------------------------------------------
// Test helpers
//-----------------------------------------------------------------------------
fn raw_request(method: &str, target: &str, headers: &[(&str, &str)]) -> Vec<u8> {
    let mut out = format!("{method} {target} HTTP/1.1\r\n");
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str("\r\n");
    out.into_bytes()
}

async fn make_session(request: &[u8]) -> Session {
    let (mut client_side, server_side) = duplex(64 * 1024);
    // Build a real Session backed by memory IO.
    let mut session = Session::new_h1(Box::new(server_side));
    client_side.write_all(request).await.unwrap();
    assert!(session.read_request().await.unwrap());
    session
}

//-----------------------------------------------------------------------------
// Hydration
//-----------------------------------------------------------------------------
#[tokio::test]
async fn hydrate_captures_path_host_and_referer() {
    // Arrange
    let request = raw_request(
        "GET",
        "/https://site.example/a?b=c",
        &[
            ("Host", "proxy.example:8080"),
            ("Referer", "http://proxy.example:8080/https://site.example/"),
            ("Cookie", "sid=1; __proxy_target__=https%3A%2F%2Fsite.example"),
        ],
    );
    let session = make_session(&request).await;
    let mut ctx = RequestCtx::empty();

    // Act
    ctx.hydrate_from_session(&session);

    // Assert
    assert!(ctx.hydrated);
    assert_eq!(ctx.method, Method::GET);
    assert_eq!(ctx.path_and_query, "/https://site.example/a?b=c");
    assert_eq!(ctx.host.as_deref(), Some("proxy.example:8080"));
    assert_eq!(
        ctx.referer.as_deref(),
        Some("http://proxy.example:8080/https://site.example/")
    );
    assert_eq!(
        ctx.recovery_cookie.as_deref(),
        Some("https%3A%2F%2Fsite.example")
    );
    assert_eq!(ctx.stage, Stage::ReceiveRequest);
}

#[tokio::test]
async fn root_path_is_landing() {
    let request = raw_request("GET", "/", &[("Host", "proxy.example")]);
    let session = make_session(&request).await;
    let mut ctx = RequestCtx::empty();

    ctx.hydrate_from_session(&session);

    assert!(ctx.is_landing());
    assert!(ctx.target().is_none());
}

#[tokio::test]
async fn root_path_with_query_is_not_landing() {
    let request = raw_request("GET", "/?url=x", &[("Host", "proxy.example")]);
    let session = make_session(&request).await;
    let mut ctx = RequestCtx::empty();

    ctx.hydrate_from_session(&session);

    assert!(!ctx.is_landing());
}

#[test]
fn each_context_gets_its_own_request_id() {
    let a = RequestCtx::empty();
    let b = RequestCtx::empty();

    assert_ne!(a.request_id, b.request_id);
    assert_eq!(a.request_id.as_str().len(), 36);
}
