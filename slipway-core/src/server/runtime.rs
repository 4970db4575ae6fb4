use crate::conf::ConfigError;
use crate::conf::types::RuntimeConfig;
use crate::engine::{HeaderPolicy, ProxyOrigin, ResolveError};
use http::HeaderValue;
use std::time::Duration;

/// Immutable per-process settings shared by every request.
#[derive(Debug, Clone)]
pub struct ProxyRuntime {
    /// Fixed origin from config. When unset it is derived per request.
    pub public_origin: Option<ProxyOrigin>,

    /// Scheme used when deriving the origin from `Host`.
    pub listener_tls: bool,

    pub header_policy: HeaderPolicy,

    pub recovery_cookie: bool,

    pub max_rewrite_bytes: u64,

    pub connect_timeout: Duration,

    pub read_timeout: Duration,
}

impl ProxyRuntime {
    pub fn from_config(cfg: &RuntimeConfig) -> Result<Self, ConfigError> {
        let proxy = &cfg.proxy;

        let public_origin = proxy
            .public_origin
            .as_deref()
            .map(|raw| {
                ProxyOrigin::parse(raw).map_err(|e| ConfigError::InvalidPublicOrigin {
                    origin: raw.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let default_user_agent = HeaderValue::from_str(&proxy.default_user_agent)
            .map_err(|_| ConfigError::InvalidUserAgent)?;

        Ok(Self {
            public_origin,
            listener_tls: cfg.server.tls.is_some(),
            header_policy: HeaderPolicy {
                forward_cookies: proxy.forward_cookies,
                spoof_origin_on_safe_methods: proxy.spoof_origin_on_safe_methods,
                default_user_agent,
            },
            recovery_cookie: proxy.recovery_cookie,
            max_rewrite_bytes: proxy.max_rewrite_bytes,
            connect_timeout: Duration::from_millis(proxy.connect_timeout_ms),
            read_timeout: Duration::from_millis(proxy.read_timeout_ms),
        })
    }

    /// The origin clients used for this request.
    pub fn origin_for(&self, host: Option<&str>) -> Result<ProxyOrigin, ResolveError> {
        if let Some(origin) = &self.public_origin {
            return Ok(origin.clone());
        }

        let host = host.ok_or_else(|| ResolveError::UnknownOrigin {
            reason: "request carries no Host header".to_string(),
        })?;
        let scheme = if self.listener_tls { "https" } else { "http" };

        ProxyOrigin::from_authority(scheme, host).map_err(|e| ResolveError::UnknownOrigin {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::types::{ProxyConfig, ServerConfig};
    use pretty_assertions::assert_eq;

    fn config(proxy: ProxyConfig) -> RuntimeConfig {
        RuntimeConfig {
            server: ServerConfig {
                listen: "127.0.0.1:8080".to_string(),
                threads: None,
                pid_file: None,
                ca_file: None,
                tls: None,
            },
            proxy,
        }
    }

    #[test]
    fn origin_is_derived_from_host() {
        let runtime = ProxyRuntime::from_config(&config(ProxyConfig::default())).unwrap();

        let origin = runtime.origin_for(Some("LocalHost:8080")).unwrap();

        assert_eq!(origin.as_str(), "http://localhost:8080");
    }

    #[test]
    fn configured_origin_wins_over_host() {
        let runtime = ProxyRuntime::from_config(&config(ProxyConfig {
            public_origin: Some("https://proxy.example".to_string()),
            ..ProxyConfig::default()
        }))
        .unwrap();

        let origin = runtime.origin_for(Some("10.0.0.5:8080")).unwrap();

        assert_eq!(origin.as_str(), "https://proxy.example");
    }

    #[test]
    fn missing_host_is_an_error() {
        let runtime = ProxyRuntime::from_config(&config(ProxyConfig::default())).unwrap();

        assert!(matches!(
            runtime.origin_for(None),
            Err(ResolveError::UnknownOrigin { .. })
        ));
    }

    #[test]
    fn timeouts_are_converted() {
        let runtime = ProxyRuntime::from_config(&config(ProxyConfig {
            connect_timeout_ms: 1500,
            read_timeout_ms: 2500,
            ..ProxyConfig::default()
        }))
        .unwrap();

        assert_eq!(runtime.connect_timeout, Duration::from_millis(1500));
        assert_eq!(runtime.read_timeout, Duration::from_millis(2500));
    }
}
