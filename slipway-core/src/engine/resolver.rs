use crate::engine::codec::unwrap_embedded;
use crate::engine::error::ResolveError;
use crate::engine::origin::ProxyOrigin;
use percent_encoding::percent_decode_str;
use url::Url;

/// Everything the resolver may consult for one request.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResolveInput<'a> {
    /// Raw request path and query, starting with `/`.
    pub path_and_query: &'a str,
    /// Raw `Referer` header, if any.
    pub referer: Option<&'a str>,
    /// Percent-encoded value of the recovery cookie, if any.
    pub recovery_cookie: Option<&'a str>,
}

/// Which strategy produced the destination. Logged with every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    Path,
    Referer,
    Cookie,
    BareHost,
}

impl ResolvedVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvedVia::Path => "path",
            ResolvedVia::Referer => "referer",
            ResolvedVia::Cookie => "cookie",
            ResolvedVia::BareHost => "bare_host",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub target: Url,
    pub via: ResolvedVia,
}

/// Turns the incoming request into an absolute destination URL.
///
/// Strategies run in order and the first to yield an absolute URL wins:
/// 1. the path itself carries an `http(s)://` target
/// 2. the `Referer` is a proxy URL whose embedded target becomes the base
/// 3. the recovery cookie names the origin of the last proxied page
/// 4. the path looks like a bare host (`example.com/x`)
pub struct TargetResolver<'a> {
    origin: &'a ProxyOrigin,
}

impl<'a> TargetResolver<'a> {
    pub fn new(origin: &'a ProxyOrigin) -> Self {
        Self { origin }
    }

    pub fn resolve(&self, input: &ResolveInput<'_>) -> Result<Resolved, ResolveError> {
        let remainder = input
            .path_and_query
            .strip_prefix('/')
            .unwrap_or(input.path_and_query);
        if remainder.is_empty() {
            return Err(ResolveError::EmptyPath);
        }

        if let Some(target) = self.from_path(remainder)? {
            return Ok(Resolved {
                target,
                via: ResolvedVia::Path,
            });
        }

        if let Some(target) = input
            .referer
            .and_then(|referer| self.base_from_referer(referer))
            .and_then(|base| self.join_root_relative(&base, remainder))
        {
            return Ok(Resolved {
                target,
                via: ResolvedVia::Referer,
            });
        }

        if let Some(target) = input
            .recovery_cookie
            .and_then(|cookie| self.base_from_cookie(cookie))
            .and_then(|base| self.join_root_relative(&base, remainder))
        {
            return Ok(Resolved {
                target,
                via: ResolvedVia::Cookie,
            });
        }

        if let Some(target) = bare_host(remainder) {
            return Ok(Resolved {
                target,
                via: ResolvedVia::BareHost,
            });
        }

        Err(ResolveError::Unrecoverable {
            path: input.path_and_query.to_string(),
        })
    }

    /// Step 1. `Ok(None)` means the path does not start with a scheme at all;
    /// a scheme that fails to parse is an error, never a guess.
    fn from_path(&self, remainder: &str) -> Result<Option<Url>, ResolveError> {
        let Some(mut candidate) = unwrap_embedded(remainder) else {
            return Ok(None);
        };

        loop {
            let url = Url::parse(&candidate).map_err(|_| ResolveError::InvalidUrl {
                raw: candidate.clone(),
            })?;
            if url.host_str().is_none_or(str::is_empty) {
                return Err(ResolveError::InvalidUrl { raw: candidate });
            }
            if !self.origin.matches(&url) {
                return Ok(Some(url));
            }

            // The target is the proxy itself; peel one layer and retry.
            let inner = &url[url::Position::BeforePath..];
            match unwrap_embedded(inner.trim_start_matches('/')) {
                Some(next) => candidate = next,
                None => return Err(ResolveError::Recursive { target: candidate }),
            }
        }
    }

    fn base_from_referer(&self, referer: &str) -> Option<Url> {
        let referer = Url::parse(referer.trim()).ok()?;
        if !self.origin.matches(&referer) {
            return None;
        }
        let embedded = &referer[url::Position::BeforePath..];
        let base = Url::parse(&unwrap_embedded(embedded.trim_start_matches('/'))?).ok()?;
        self.usable_base(base)
    }

    fn base_from_cookie(&self, cookie: &str) -> Option<Url> {
        let decoded = percent_decode_str(cookie.trim()).decode_utf8_lossy();
        let base = Url::parse(&decoded).ok()?;
        self.usable_base(base)
    }

    fn usable_base(&self, base: Url) -> Option<Url> {
        let http = matches!(base.scheme(), "http" | "https");
        (http && base.host_str().is_some() && !self.origin.matches(&base)).then_some(base)
    }

    /// Resolves the remainder as a root-relative path against `base`.
    fn join_root_relative(&self, base: &Url, remainder: &str) -> Option<Url> {
        let path = format!("/{}", remainder.trim_start_matches('/'));
        let joined = base.join(&path).ok()?;
        // A path that itself contains a nested target still collapses.
        let collapsed = unwrap_embedded(joined.as_str())?;
        let url = Url::parse(&collapsed).ok()?;
        (!self.origin.matches(&url)).then_some(url)
    }
}

/// Step 4: `example.com/x` becomes `https://example.com/x`.
fn bare_host(remainder: &str) -> Option<Url> {
    let host_end = remainder.find(['/', '?', '#']).unwrap_or(remainder.len());
    let host = &remainder[..host_end];
    if !host.contains('.') || host.starts_with('.') || host.ends_with('.') {
        return None;
    }
    let url = Url::parse(&format!("https://{remainder}")).ok()?;
    url.host_str().is_some().then_some(url)
}
