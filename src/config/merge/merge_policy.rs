//! Merge rules: defaults, override order, conflict handling.

use crate::store::DEFAULT_STORE_FILE_NAME;
use crate::watch::DEFAULT_DEBOUNCE_MS;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment};

/// Environment variable prefix; `MARGIN_PROVIDER__MODEL` sets `provider.model`.
pub const ENV_PREFIX: &str = "MARGIN";
pub const ENV_SEPARATOR: &str = "__";

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("provider.provider_type", "openai")?
        .set_default("provider.model", "gpt-4o-mini")?
        .set_default("store.file_name", DEFAULT_STORE_FILE_NAME)?
        .set_default("watch.debounce_ms", DEFAULT_DEBOUNCE_MS)
}

/// Environment layer, applied last so it overrides every file.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}
