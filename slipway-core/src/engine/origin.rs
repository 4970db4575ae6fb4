use crate::engine::codec::UrlWrapper;
use crate::engine::error::OriginError;
use url::Url;

/// Scheme and authority the browser uses to talk to the proxy,
/// e.g. `https://proxy.example` or `http://127.0.0.1:8080`.
///
/// Stored in its ASCII origin serialization (lowercase host, default port
/// omitted, no trailing slash) so prefix checks are plain string compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyOrigin {
    origin: String,
    secure: bool,
}

impl ProxyOrigin {
    /// Parses a configured origin such as `https://proxy.example`.
    ///
    /// Rejects anything carrying a path, query or fragment, since the
    /// origin is used as a literal prefix for every encoded URL.
    pub fn parse(raw: &str) -> Result<Self, OriginError> {
        let invalid = |reason| OriginError::Invalid {
            raw: raw.to_string(),
            reason,
        };

        let url = Url::parse(raw.trim()).map_err(|_| invalid("not an absolute URL"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("must not contain a path, query or fragment"));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid("must not contain credentials"));
        }

        Ok(Self {
            origin: url.origin().ascii_serialization(),
            secure: url.scheme() == "https",
        })
    }

    /// Builds the origin from a request `Host` header (or `:authority`).
    pub fn from_authority(scheme: &str, authority: &str) -> Result<Self, OriginError> {
        if authority.is_empty() || authority.contains(['/', '?', '#', '@']) {
            return Err(OriginError::Invalid {
                raw: authority.to_string(),
                reason: "not a host[:port] authority",
            });
        }
        Self::parse(&format!("{scheme}://{authority}"))
    }

    pub fn as_str(&self) -> &str {
        &self.origin
    }

    /// True when the proxy is served over TLS.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// True when `url` has exactly this origin (scheme, host and port).
    pub fn matches(&self, url: &Url) -> bool {
        url.origin().ascii_serialization() == self.origin
    }
}

/// Per-request tuple handed to every content rewriter.
///
/// Immutable for the lifetime of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteContext {
    origin: ProxyOrigin,
    target: Url,
}

impl RewriteContext {
    pub fn new(origin: ProxyOrigin, target: Url) -> Self {
        Self { origin, target }
    }

    pub fn origin(&self) -> &ProxyOrigin {
        &self.origin
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Wrapper resolving references against the target URL itself.
    pub fn wrapper(&self) -> UrlWrapper<'_> {
        UrlWrapper::new(&self.origin, &self.target)
    }

    /// Wrapper resolving references against an explicit base, used once a
    /// document declares its own `<base href>`.
    pub fn wrapper_with_base<'a>(&'a self, base: &'a Url) -> UrlWrapper<'a> {
        UrlWrapper::new(&self.origin, base)
    }
}
