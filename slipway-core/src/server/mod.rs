mod pid;
mod runtime;
pub mod setup;

pub use runtime::ProxyRuntime;
pub use setup::{build_pingora_server, run};
