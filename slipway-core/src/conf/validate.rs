use crate::conf::error::ConfigError;
use crate::conf::types::RuntimeConfig;
use crate::engine::ProxyOrigin;
use http::HeaderValue;
use std::net::SocketAddr;

/// Semantic checks. All problems are collected before failing.
pub fn validate_config(cfg: &RuntimeConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    //--------------------------------------------------------------------------
    // Server
    //--------------------------------------------------------------------------
    if cfg.server.listen.parse::<SocketAddr>().is_err() {
        errors.push(ConfigError::InvalidListenAddr {
            addr: cfg.server.listen.clone(),
        });
    }

    if cfg.server.threads == Some(0) {
        errors.push(ConfigError::ZeroThreads);
    }

    if let Some(tls) = &cfg.server.tls {
        if !tls.cert.is_file() {
            errors.push(ConfigError::MissingCertFile {
                path: tls.cert.clone(),
            });
        }
        if !tls.key.is_file() {
            errors.push(ConfigError::MissingKeyFile {
                path: tls.key.clone(),
            });
        }
    }

    //--------------------------------------------------------------------------
    // Proxy
    //--------------------------------------------------------------------------
    if let Some(origin) = &cfg.proxy.public_origin {
        if let Err(e) = ProxyOrigin::parse(origin) {
            errors.push(ConfigError::InvalidPublicOrigin {
                origin: origin.clone(),
                reason: e.to_string(),
            });
        }
    }

    if HeaderValue::from_str(&cfg.proxy.default_user_agent).is_err() {
        errors.push(ConfigError::InvalidUserAgent);
    }

    for (field, value) in [
        ("max_rewrite_bytes", cfg.proxy.max_rewrite_bytes),
        ("connect_timeout_ms", cfg.proxy.connect_timeout_ms),
        ("read_timeout_ms", cfg.proxy.read_timeout_ms),
    ] {
        if value == 0 {
            errors.push(ConfigError::ZeroLimit { field });
        }
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ConfigError::Validation { errors }),
    }
}
