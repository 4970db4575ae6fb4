use crate::conf::{ConfigError, load_config, parse_config};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use tempfile::{TempDir, tempdir};

fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("slipway.hcl");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

//-----------------------------------------------------------------------------
// Parsing
//-----------------------------------------------------------------------------
#[test]
fn minimal_config_gets_proxy_defaults() {
    // Arrange
    let (_dir, path) = write_config(
        r#"
server {
  listen = "127.0.0.1:8080"
}
"#,
    );

    // Act
    let cfg = load_config(&path).unwrap();

    // Assert
    assert_eq!(cfg.server.listen, "127.0.0.1:8080");
    assert_eq!(cfg.server.threads, None);
    assert!(cfg.proxy.forward_cookies);
    assert!(!cfg.proxy.spoof_origin_on_safe_methods);
    assert!(cfg.proxy.recovery_cookie);
    assert_eq!(cfg.proxy.public_origin, None);
    assert_eq!(cfg.proxy.max_rewrite_bytes, 16 * 1024 * 1024);
}

#[test]
fn full_config_is_parsed() {
    // Arrange
    let (_dir, path) = write_config(
        r#"
server {
  listen   = "0.0.0.0:9000"
  threads  = 4
  pid_file = "/tmp/slipway.pid"
}

proxy {
  public_origin                = "https://proxy.example"
  forward_cookies              = false
  spoof_origin_on_safe_methods = true
  recovery_cookie              = false
  default_user_agent           = "slipway-test"
  max_rewrite_bytes            = 1024
  connect_timeout_ms           = 500
  read_timeout_ms              = 750
}
"#,
    );

    // Act
    let cfg = load_config(&path).unwrap();

    // Assert
    assert_eq!(cfg.server.threads, Some(4));
    assert_eq!(cfg.server.pid_file, Some(PathBuf::from("/tmp/slipway.pid")));
    assert_eq!(cfg.proxy.public_origin.as_deref(), Some("https://proxy.example"));
    assert!(!cfg.proxy.forward_cookies);
    assert!(cfg.proxy.spoof_origin_on_safe_methods);
    assert!(!cfg.proxy.recovery_cookie);
    assert_eq!(cfg.proxy.default_user_agent, "slipway-test");
    assert_eq!(cfg.proxy.max_rewrite_bytes, 1024);
    assert_eq!(cfg.proxy.connect_timeout_ms, 500);
    assert_eq!(cfg.proxy.read_timeout_ms, 750);
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempdir().unwrap();

    let err = parse_config(&dir.path().join("nope.hcl")).unwrap_err();

    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

#[test]
fn malformed_hcl_is_a_parse_error() {
    let (_dir, path) = write_config("server {");

    let err = parse_config(&path).unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }));
}

//-----------------------------------------------------------------------------
// Validation
//-----------------------------------------------------------------------------
#[test]
fn invalid_listen_address_is_rejected() {
    let (_dir, path) = write_config(
        r#"
server {
  listen = "not-an-address"
}
"#,
    );

    let err = load_config(&path).unwrap_err();

    assert!(matches!(err, ConfigError::InvalidListenAddr { .. }));
}

#[test]
fn public_origin_with_path_is_rejected() {
    let (_dir, path) = write_config(
        r#"
server {
  listen = "127.0.0.1:8080"
}

proxy {
  public_origin = "https://proxy.example/sub"
}
"#,
    );

    let err = load_config(&path).unwrap_err();

    assert!(matches!(err, ConfigError::InvalidPublicOrigin { .. }));
}

#[test]
fn all_validation_errors_are_reported_together() {
    // Arrange
    let (_dir, path) = write_config(
        r#"
server {
  listen  = "127.0.0.1:8080"
  threads = 0

  tls {
    cert = "/definitely/missing/cert.pem"
    key  = "/definitely/missing/key.pem"
  }
}

proxy {
  read_timeout_ms = 0
}
"#,
    );

    // Act
    let err = load_config(&path).unwrap_err();

    // Assert
    match err {
        ConfigError::Validation { errors } => {
            assert_eq!(errors.len(), 4);
            assert!(matches!(errors[0], ConfigError::ZeroThreads));
            assert!(matches!(errors[1], ConfigError::MissingCertFile { .. }));
            assert!(matches!(errors[2], ConfigError::MissingKeyFile { .. }));
            assert!(matches!(
                errors[3],
                ConfigError::ZeroLimit {
                    field: "read_timeout_ms"
                }
            ));
        }
        other => panic!("Expected Validation, got {:?}", other),
    }
}
