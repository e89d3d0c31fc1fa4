//! Configuration management for PUMA decision points
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (PUMA_* prefix, `__` between nested keys)
//! 2. puma.local.toml (local overrides, not checked in)
//! 3. puma.toml (project config)
//! 4. ~/.config/puma/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main PUMA configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PumaConfig {
    pub pdp: PdpConfig,
    pub central: CentralConfig,
}

/// The application-level decision point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdpConfig {
    pub policy_dir: PathBuf,
    pub policy_file: String,
    /// Id the application policy must declare.
    pub expected_policy_id: String,
    /// Whether the network-querying attribute finder takes part.
    pub allow_remote_access: bool,
}

impl Default for PdpConfig {
    fn default() -> Self {
        Self {
            policy_dir: PathBuf::from("policies"),
            policy_file: "application-policy.xml".to_string(),
            expected_policy_id: "application-policy".to_string(),
            allow_remote_access: false,
        }
    }
}

/// Remote evaluator modules that escalate to the central decision point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CentralConfig {
    /// Modules to register, in routing order.
    pub transports: Vec<TransportKind>,
    /// Policy references every module answers for.
    pub supported_policy_ids: Vec<String>,
    pub binary: BinaryTransportConfig,
    pub rest: RestTransportConfig,
    pub legacy: LegacyTransportConfig,
}

impl Default for CentralConfig {
    fn default() -> Self {
        Self {
            transports: vec![TransportKind::Binary],
            supported_policy_ids: vec!["central-puma-policy".to_string()],
            binary: BinaryTransportConfig::default(),
            rest: RestTransportConfig::default(),
            legacy: LegacyTransportConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Legacy,
    Binary,
    Rest,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Legacy => "legacy",
            Self::Binary => "binary",
            Self::Rest => "rest",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryTransportConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub call_timeout_ms: u64,
}

impl Default for BinaryTransportConfig {
    fn default() -> Self {
        Self {
            host: "puma-central-puma-pdp".to_string(),
            port: 9091,
            connect_timeout_ms: 2000,
            call_timeout_ms: 5000,
        }
    }
}

impl BinaryTransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestTransportConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for RestTransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://puma-central-puma-pdp:8080".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl RestTransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyTransportConfig {
    /// Name the central authority is bound under.
    pub registry_name: String,
    pub call_timeout_ms: u64,
}

impl Default for LegacyTransportConfig {
    fn default() -> Self {
        Self {
            registry_name: "central-puma-pdp".to_string(),
            call_timeout_ms: 5000,
        }
    }
}

impl LegacyTransportConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl PumaConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        if self.pdp.policy_dir.is_relative() {
            self.pdp.policy_dir = base_dir.as_ref().join(&self.pdp.policy_dir);
        }
    }

    /// The application policy file.
    pub fn policy_path(&self) -> PathBuf {
        self.pdp.policy_dir.join(&self.pdp.policy_file)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| Err(ConfigError::Validation(message.to_string()));

        if self.pdp.policy_file.is_empty() {
            return invalid("pdp.policy_file must not be empty");
        }
        if self.pdp.expected_policy_id.is_empty() {
            return invalid("pdp.expected_policy_id must not be empty");
        }

        let central = &self.central;
        if central.supported_policy_ids.is_empty()
            || central.supported_policy_ids.iter().any(String::is_empty)
        {
            return invalid("central.supported_policy_ids must list at least one non-empty id");
        }
        if central.binary.host.is_empty() {
            return invalid("central.binary.host must not be empty");
        }
        if central.binary.port == 0 {
            return invalid("central.binary.port must not be 0");
        }
        if central.binary.connect_timeout_ms == 0 || central.binary.call_timeout_ms == 0 {
            return invalid("central.binary timeouts must be positive");
        }
        if !(central.rest.base_url.starts_with("http://")
            || central.rest.base_url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "central.rest.base_url must be an http(s) URL, got \"{}\"",
                central.rest.base_url
            )));
        }
        if central.rest.timeout_ms == 0 {
            return invalid("central.rest.timeout_ms must be positive");
        }
        if central.legacy.registry_name.is_empty() {
            return invalid("central.legacy.registry_name must not be empty");
        }
        if central.legacy.call_timeout_ms == 0 {
            return invalid("central.legacy.call_timeout_ms must be positive");
        }
        Ok(())
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
