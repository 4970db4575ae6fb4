use thiserror::Error;

/// The incoming request does not carry a usable destination.
///
/// Always surfaced to the client as `400 Bad Request`, never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("the request path does not name a destination")]
    EmptyPath,

    #[error("'{raw}' is not a valid destination URL")]
    InvalidUrl { raw: String },

    #[error("destination '{target}' points back at this proxy")]
    Recursive { target: String },

    #[error("no destination could be recovered for '{path}'")]
    Unrecoverable { path: String },

    #[error("the proxy origin could not be determined: {reason}")]
    UnknownOrigin { reason: String },
}

/// A single URL reference inside rewritten content could not be processed.
///
/// Recovered locally: the offending line or attribute is left as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("'{value}' is not a resolvable URL reference")]
    UnparseableReference { value: String },

    #[error("body is not valid UTF-8")]
    NotUtf8,

    #[error("markup rewriting failed: {reason}")]
    Markup { reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OriginError {
    #[error("invalid proxy origin '{raw}': {reason}")]
    Invalid { raw: String, reason: &'static str },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to decode {coding} body: {source}")]
    Io {
        coding: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("decoded {coding} body exceeds {limit} bytes")]
    TooLarge { coding: &'static str, limit: u64 },

    #[error("unsupported content coding")]
    Unsupported,
}
