use std::collections::BTreeMap;

use serde::Deserialize;
use mmcall_core::error::{MmError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub codec: CodecSection,

    #[serde(default)]
    pub policy: PolicySection,

    #[serde(default)]
    pub auth: BTreeMap<String, ProviderConfig>,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MmError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.codec.validate()?;
        for (name, p) in &self.auth {
            p.validate(name)?;
        }

        Ok(())
    }

    /// Response validation follows `debug` unless set explicitly.
    pub fn validate_responses(&self) -> bool {
        self.policy
            .validate_responses
            .unwrap_or(self.server.debug)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_true")]
    pub discovery: bool,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    #[serde(default)]
    pub throttle_response: Option<ThrottleConfig>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            api_prefix: default_api_prefix(),
            debug: false,
            discovery: true,
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            throttle_response: None,
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        if !self.api_prefix.starts_with('/') {
            return Err(MmError::Config(
                "server.api_prefix must start with '/'".into(),
            ));
        }
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(MmError::Config(
                "server.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(MmError::Config(
                "server.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(MmError::Config(
                "server.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if let Some(t) = &self.throttle_response {
            if t.min_ms > t.max_ms {
                return Err(MmError::Config(
                    "server.throttle_response.min_ms must not exceed max_ms".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Artificial reply delay bounds, in milliseconds.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrottleConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodecSection {
    #[serde(default = "default_limit_bytes")]
    pub limit_bytes: usize,
}

impl Default for CodecSection {
    fn default() -> Self {
        Self {
            limit_bytes: default_limit_bytes(),
        }
    }
}

impl CodecSection {
    pub fn validate(&self) -> Result<()> {
        if self.limit_bytes == 0 {
            return Err(MmError::Config("codec.limit_bytes must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySection {
    /// `None` => validate responses only in debug mode.
    #[serde(default)]
    pub validate_responses: Option<bool>,

    /// When true, a bad credential on an optional-auth method is rejected
    /// instead of being ignored.
    #[serde(default)]
    pub reject_invalid_optional_credentials: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default = "default_true")]
    pub active: bool,

    pub token: TokenConfig,

    /// bcrypt cost.
    #[serde(default = "default_hash_cost")]
    pub hash: u32,
}

impl ProviderConfig {
    pub fn validate(&self, name: &str) -> Result<()> {
        if !matches!(self.token.algorithm.as_str(), "HS256" | "HS384" | "HS512") {
            return Err(MmError::Config(format!(
                "auth.{name}.token.algorithm must be HS256, HS384 or HS512"
            )));
        }
        if self.active && self.token.key.is_empty() {
            return Err(MmError::Config(format!(
                "auth.{name}.token.key must not be empty"
            )));
        }
        if !(1..=MAX_TOKEN_LIFETIME_SECS).contains(&self.token.expires_in_secs) {
            return Err(MmError::Config(format!(
                "auth.{name}.token.expires_in_secs must be between 1 and {MAX_TOKEN_LIFETIME_SECS}"
            )));
        }
        if !(4..=31).contains(&self.hash) {
            return Err(MmError::Config(format!(
                "auth.{name}.hash must be between 4 and 31"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    pub key: String,

    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    #[serde(default = "default_expires_in_secs")]
    pub expires_in_secs: u64,

    #[serde(default)]
    pub subject: Option<String>,

    #[serde(default)]
    pub audience: Option<String>,

    #[serde(default)]
    pub issuer: Option<String>,
}

/// Ten years.
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 10 * 365 * 24 * 3600;

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_api_prefix() -> String {
    "/api".into()
}
fn default_true() -> bool {
    true
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_limit_bytes() -> usize {
    100 * 1024
}
fn default_algorithm() -> String {
    "HS256".into()
}
fn default_expires_in_secs() -> u64 {
    30 * 24 * 3600
}
fn default_hash_cost() -> u32 {
    10
}
