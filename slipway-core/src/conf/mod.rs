mod error;
mod loader;
pub mod types;
mod validate;

#[cfg(test)]
mod tests;

pub use error::ConfigError;
pub use loader::{load_config, parse_config};
pub use validate::validate_config;
