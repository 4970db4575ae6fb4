use crate::engine::headers::DEFAULT_USER_AGENT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root of `slipway.hcl`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuntimeConfig {
    pub server: ServerConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Socket address to listen on, e.g. `0.0.0.0:8080`.
    pub listen: String,

    /// Optional number of worker threads - default is decided by Pingora.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Optional pid file path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid_file: Option<PathBuf>,

    /// Optional CA file path. If set, Pingora will use this file to verify upstream certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,

    /// Terminate TLS on the listener.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyConfig {
    /// Origin browsers use to reach the proxy. Derived from `Host` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_origin: Option<String>,

    #[serde(default = "default_true")]
    pub forward_cookies: bool,

    #[serde(default)]
    pub spoof_origin_on_safe_methods: bool,

    /// Set the target-origin cookie on proxied HTML documents.
    #[serde(default = "default_true")]
    pub recovery_cookie: bool,

    #[serde(default = "default_user_agent")]
    pub default_user_agent: String,

    /// Bodies announced larger than this are streamed through unmodified.
    #[serde(default = "default_max_rewrite_bytes")]
    pub max_rewrite_bytes: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            public_origin: None,
            forward_cookies: true,
            spoof_origin_on_safe_methods: false,
            recovery_cookie: true,
            default_user_agent: default_user_agent(),
            max_rewrite_bytes: default_max_rewrite_bytes(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_max_rewrite_bytes() -> u64 {
    16 * 1024 * 1024
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_read_timeout_ms() -> u64 {
    30_000
}
