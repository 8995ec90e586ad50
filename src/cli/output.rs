//! CLI output: map domain errors to user-facing messages.

use crate::error::ApiError;

/// User-facing message for `e`, with a hint where one helps.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::ProviderNotConfigured(_) => format!(
            "{}\nHint: configure [provider] in .margin/config.toml or set an API key (see `margin status`).",
            e
        ),
        ApiError::UnsupportedFile(_) => format!(
            "{}\nHint: margin recognizes files by extension (.rs, .py, .ts, ...).",
            e
        ),
        _ => e.to_string(),
    }
}
