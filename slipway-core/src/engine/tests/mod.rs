mod css_tests;
mod markup_tests;
mod playlist_tests;

use crate::engine::{ProxyOrigin, RewriteContext};
use url::Url;

pub(super) const PROXY: &str = "https://proxy.example";

pub(super) fn proxy_origin() -> ProxyOrigin {
    ProxyOrigin::parse(PROXY).unwrap()
}

pub(super) fn context(target: &str) -> RewriteContext {
    RewriteContext::new(proxy_origin(), Url::parse(target).unwrap())
}
