use integration_tests::harness::{ScriptedResponse, TestServer, Upstream};
use pretty_assertions::assert_eq;

fn ok() -> ScriptedResponse {
    ScriptedResponse::new(200)
        .header("Content-Type", "text/plain")
        .body("ok")
}

#[test]
fn absolute_target_in_path() {
    // Arrange
    let upstream = Upstream::fixed(ok());
    let server = TestServer::start();

    // Act
    let res = server
        .get(&format!("/{}", upstream.url("/api/items?page=2")))
        .send()
        .unwrap();

    // Assert
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().unwrap(), "ok");
    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/api/items?page=2");
}

#[test]
fn root_relative_request_recovered_from_referer() {
    let upstream = Upstream::fixed(ok());
    let server = TestServer::start();
    let referer = server.proxied(&upstream.url("/app/index.html"));

    let res = server
        .get("/static/app.js")
        .header("Referer", referer)
        .send()
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(upstream.requests()[0].path, "/static/app.js");
}

#[test]
fn root_relative_request_recovered_from_cookie() {
    let upstream = Upstream::fixed(ok());
    let server = TestServer::start();
    let cookie = format!(
        "__proxy_target__=http%3A%2F%2F127.0.0.1%3A{}",
        upstream.port()
    );

    let res = server
        .get("/images/logo.png")
        .header("Cookie", cookie)
        .send()
        .unwrap();

    assert_eq!(res.status(), 200);
    let requests = upstream.requests();
    assert_eq!(requests[0].path, "/images/logo.png");
    assert_eq!(requests[0].header("cookie"), None);
}

#[test]
fn landing_page_is_served_for_root() {
    let server = TestServer::start();

    let res = server.get("/").send().unwrap();

    assert_eq!(res.status(), 200);
    assert!(
        res.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/html"))
    );
    assert!(res.text().unwrap().contains("<form"));
}

#[test]
fn access_log_records_resolution() {
    let upstream = Upstream::fixed(ok());
    let server = TestServer::start();
    let path = format!("/{}", upstream.url("/logged"));

    let res = server.get(&path).send().unwrap();
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let event = server.access_log(&path);
    assert_eq!(event.field("status"), Some("200"));
    assert_eq!(event.field("resolved_via"), Some("path"));
    assert_eq!(event.field("request_id"), request_id.as_deref());
}
