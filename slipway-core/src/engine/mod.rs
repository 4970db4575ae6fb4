//! URL rewriting engine.
//!
//! Everything in here is synchronous and free of I/O: the proxy layer hands
//! in headers and fully buffered bodies and gets rewritten ones back.

pub mod codec;
pub mod content;
pub mod cookie;
pub mod css;
pub mod error;
pub mod headers;
pub mod markup;
pub mod origin;
pub mod playlist;
pub mod redirect;
pub mod resolver;
pub mod shim;

#[cfg(test)]
mod tests;

pub use codec::{UrlWrapper, decode, encode, is_encoded};
pub use content::{BodyDecoder, ContentCoding, ContentKind};
pub use error::{DecodeError, OriginError, ResolveError, RewriteError};
pub use headers::{HeaderPolicy, HeaderTransformer};
pub use origin::{ProxyOrigin, RewriteContext};
pub use resolver::{ResolveInput, Resolved, ResolvedVia, TargetResolver};

use bytes::Bytes;

/// Rewrites a complete, already decoded upstream body.
///
/// Never fails: a body that cannot be rewritten is returned as given.
pub fn rewrite_body(kind: ContentKind, decoded: Bytes, ctx: &RewriteContext) -> Bytes {
    let rewritten = match kind {
        ContentKind::Markup => markup::rewrite_markup(&decoded, ctx),
        ContentKind::Playlist => as_text(&decoded)
            .map(|text| playlist::rewrite_playlist(text, &ctx.wrapper()).into_bytes()),
        ContentKind::Stylesheet => {
            as_text(&decoded).map(|text| css::rewrite_css(text, &ctx.wrapper()).into_bytes())
        }
        ContentKind::Passthrough => return decoded,
    };

    match rewritten {
        Ok(body) => Bytes::from(body),
        Err(e) => {
            tracing::debug!(error = %e, kind = kind.as_str(), "rewrite skipped");
            decoded
        }
    }
}

fn as_text(body: &[u8]) -> Result<&str, RewriteError> {
    std::str::from_utf8(body).map_err(|_| RewriteError::NotUtf8)
}
