//! Configuration System
//!
//! Hierarchical configuration: defaults, a global file, a workspace file and
//! `MARGIN_*` environment variables, merged with the `config` crate and
//! deserialized into [`MarginConfig`].

use crate::logging::LoggingConfig;
use crate::store::DEFAULT_STORE_FILE_NAME;
use crate::watch::DEFAULT_DEBOUNCE_MS;
use serde::{Deserialize, Serialize};

pub use crate::provider::{ProviderConfig, ProviderType};

mod loader;
mod merge;
mod sources;

pub use loader::ConfigLoader;
pub use sources::workspace_file::WORKSPACE_CONFIG_DIR;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarginConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub watch: WatchSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Cache file name, created at the workspace root.
    #[serde(default = "default_store_file_name")]
    pub file_name: String,
}

fn default_store_file_name() -> String {
    DEFAULT_STORE_FILE_NAME.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file_name: default_store_file_name(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Quiet period before a change triggers re-annotation.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ValidationError {
    Provider(String),
    Store(String),
    Watch(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Store(msg) => write!(f, "Store: {}", msg),
            ValidationError::Watch(msg) => write!(f, "Watch: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        let name = self.file_name.trim();
        if name.is_empty() {
            return Err("Store file name cannot be empty".to_string());
        }
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(format!("Store file name '{}' must be a plain file name", name));
        }
        Ok(())
    }
}

impl MarginConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.store.validate() {
            errors.push(ValidationError::Store(e));
        }
        if self.watch.debounce_ms == 0 {
            errors.push(ValidationError::Watch(
                "debounce_ms must be greater than zero".to_string(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            errors.push(ValidationError::Logging(format!(
                "Invalid log format '{}'",
                self.logging.format
            )));
        }
        if !matches!(self.logging.output.as_str(), "stdout" | "stderr" | "file") {
            errors.push(ValidationError::Logging(format!(
                "Invalid log output '{}'",
                self.logging.output
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
