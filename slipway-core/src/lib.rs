pub mod cli;
pub mod conf;
pub mod ctx;
pub mod engine;
pub mod logging;
mod proxy;
pub mod server;
