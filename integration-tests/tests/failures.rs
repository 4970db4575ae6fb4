use integration_tests::harness::server::free_port;
use integration_tests::harness::TestServer;
use pretty_assertions::assert_eq;

#[test]
fn unresolvable_path_is_bad_request() {
    // Arrange
    let server = TestServer::start();

    // Act
    let res = server.get("/nothing-here").send().unwrap();

    // Assert
    assert_eq!(res.status(), 400);
    assert!(
        res.headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/plain"))
    );
    assert!(res.text().unwrap().starts_with("400 Bad Request"));
}

#[test]
fn malformed_target_is_bad_request() {
    let server = TestServer::start();

    let res = server.get("/http://[::1/").send().unwrap();

    assert_eq!(res.status(), 400);
}

#[test]
fn target_pointing_at_the_proxy_itself_is_rejected() {
    let server = TestServer::start();

    let res = server.get(&format!("/{}/", server.base_url())).send().unwrap();

    assert_eq!(res.status(), 400);
}

#[test]
fn unreachable_destination_is_bad_gateway() {
    // Arrange
    let server = TestServer::start();
    // Nothing listens here once the temporary listener is dropped.
    let closed = free_port();

    // Act
    let res = server
        .get(&format!("/http://127.0.0.1:{closed}/"))
        .send()
        .unwrap();

    // Assert
    assert_eq!(res.status(), 502);
    assert!(res.text().unwrap().starts_with("502 Bad Gateway"));
}
