use crate::conf::error::ConfigError;
use crate::conf::types::RuntimeConfig;
use crate::conf::validate::validate_config;
use std::fs;
use std::path::Path;

/// Reads, parses and validates a config file.
pub fn load_config(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    let cfg = parse_config(path)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Reads and parses a config file without semantic validation.
pub fn parse_config(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    let s = fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    hcl::from_str(&s).map_err(|e| ConfigError::parse(path, e))
}
