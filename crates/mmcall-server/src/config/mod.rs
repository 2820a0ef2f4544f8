//! Server config loader (strict parsing).

pub mod schema;

use std::fs;

use mmcall_core::error::{MmError, Result};

pub use schema::{
    CodecSection, PolicySection, ProviderConfig, ServerConfig, ServerSection, ThrottleConfig,
    TokenConfig,
};

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MmError::Config(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig =
        serde_yaml::from_str(s).map_err(|e| MmError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
