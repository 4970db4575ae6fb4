use crate::engine::{ContentCoding, ContentKind};

/// What happens to the upstream body once its headers are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseRoute {
    /// Stream through unmodified.
    #[default]
    Passthrough,
    /// Redirect: headers only, the body is discarded.
    Redirect,
    /// Buffer until end of stream, decode, rewrite.
    Rewrite {
        kind: ContentKind,
        coding: ContentCoding,
    },
    /// Too large to rewrite after the encoding header was already dropped:
    /// stream the rest decoded.
    Decode { coding: ContentCoding },
}

impl ResponseRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseRoute::Passthrough => "passthrough",
            ResponseRoute::Redirect => "redirect",
            ResponseRoute::Rewrite { kind, .. } => kind.as_str(),
            ResponseRoute::Decode { .. } => "decode",
        }
    }
}
