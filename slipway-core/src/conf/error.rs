use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    // IO
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parsing
    #[error("failed to parse HCL in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: hcl::Error,
    },

    // Validation
    #[error("invalid listen address '{addr}'")]
    InvalidListenAddr { addr: String },

    #[error("invalid public origin '{origin}': {reason}")]
    InvalidPublicOrigin { origin: String, reason: String },

    #[error("server.threads must be greater than zero")]
    ZeroThreads,

    #[error("proxy.{field} must be greater than zero")]
    ZeroLimit { field: &'static str },

    #[error("proxy.default_user_agent is not a valid header value")]
    InvalidUserAgent,

    #[error("TLS certificate file not found: {path}")]
    MissingCertFile { path: PathBuf },

    #[error("TLS key file not found: {path}")]
    MissingKeyFile { path: PathBuf },

    #[error("invalid configuration ({} errors): {}", errors.len(), summarize(errors))]
    Validation { errors: Vec<ConfigError> },
}

impl ConfigError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: hcl::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}

fn summarize(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
