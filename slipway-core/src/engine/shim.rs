use crate::engine::origin::ProxyOrigin;
use url::Url;

const SHIM_TEMPLATE: &str = include_str!("../../assets/client_shim.js");

const ORIGIN_PLACEHOLDER: &str = "__SLIPWAY_ORIGIN__";
const BASE_PLACEHOLDER: &str = "__SLIPWAY_BASE__";

/// Marker attribute on the injected script. A page already containing it is
/// not given a second shim.
pub const SHIM_MARKER: &str = "data-slipway-shim";

/// Produces the inline `<script>` that patches fetch, XHR, history,
/// `window.open`, beacons, attribute setters and service worker
/// registration in the proxied page.
pub fn client_shim(origin: &ProxyOrigin, base: &Url) -> String {
    let script = SHIM_TEMPLATE
        .replace(ORIGIN_PLACEHOLDER, &js_string(origin.as_str()))
        .replace(BASE_PLACEHOLDER, &js_string(base.as_str()));
    format!("<script {SHIM_MARKER}>{script}</script>")
}

/// Script placed after a `<base href>` so runtime resolution follows it.
pub fn base_update(base: &Url) -> String {
    format!(
        "<script>window.__slipway&&window.__slipway.setBase({});</script>",
        js_string(base.as_str())
    )
}

/// JSON string literal that is also safe inside an inline script element.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace("</", "<\\/")
}
