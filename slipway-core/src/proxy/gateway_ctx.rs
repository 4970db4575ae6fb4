use crate::server::ProxyRuntime;
use std::sync::Arc;

pub(crate) struct GatewayCtx {
    runtime: Arc<ProxyRuntime>,
}

impl GatewayCtx {
    pub(crate) fn new(runtime: Arc<ProxyRuntime>) -> Self {
        Self { runtime }
    }

    pub(crate) fn runtime(&self) -> &ProxyRuntime {
        &self.runtime
    }
}
