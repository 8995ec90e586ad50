//! Provider profile: configured backend, model, endpoint and credentials.

use crate::error::ApiError;
use crate::provider::{CompletionOptions, ModelProvider};
use serde::{Deserialize, Serialize};

/// Environment variable checked for a key before the provider-specific one.
pub const GENERIC_API_KEY_ENV: &str = "MARGIN_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Anthropic,
    Ollama,
    #[serde(rename = "local")]
    LocalCustom,
}

pub fn provider_type_slug(provider_type: ProviderType) -> &'static str {
    match provider_type {
        ProviderType::OpenAI => "openai",
        ProviderType::Anthropic => "anthropic",
        ProviderType::Ollama => "ollama",
        ProviderType::LocalCustom => "local",
    }
}

/// Conventional environment variable holding the key for `provider_type`.
pub fn api_key_env_var(provider_type: ProviderType) -> Option<&'static str> {
    match provider_type {
        ProviderType::OpenAI => Some("OPENAI_API_KEY"),
        ProviderType::Anthropic => Some("ANTHROPIC_API_KEY"),
        ProviderType::Ollama | ProviderType::LocalCustom => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_type")]
    pub provider_type: ProviderType,

    #[serde(default = "default_model")]
    pub model: String,

    /// Inline key; the environment is consulted when absent.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL override. Required for `local`.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_completion_options")]
    pub default_options: CompletionOptions,
}

fn default_provider_type() -> ProviderType {
    ProviderType::OpenAI
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_completion_options() -> CompletionOptions {
    CompletionOptions {
        temperature: Some(0.3),
        max_tokens: Some(4096),
        ..CompletionOptions::default()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            model: default_model(),
            api_key: None,
            endpoint: None,
            default_options: default_completion_options(),
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            reqwest::Url::parse(endpoint)
                .map_err(|e| format!("Invalid endpoint '{}': {}", endpoint, e))?;
        }
        if self.provider_type == ProviderType::LocalCustom && self.endpoint.is_none() {
            return Err("Local providers require an endpoint".to_string());
        }
        if let Some(temperature) = self.default_options.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!("Temperature {} is outside 0.0-2.0", temperature));
            }
        }
        Ok(())
    }

    /// Key from config, then `MARGIN_API_KEY`, then the provider's own variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| non_empty_env(GENERIC_API_KEY_ENV))
            .or_else(|| api_key_env_var(self.provider_type).and_then(non_empty_env))
    }

    /// Human-readable credential state for status output; never prints the key.
    pub fn api_key_status(&self) -> String {
        match (api_key_env_var(self.provider_type), self.resolve_api_key()) {
            (None, Some(_)) => "set (optional)".to_string(),
            (None, None) => "not required".to_string(),
            (Some(_), Some(_)) => "set".to_string(),
            (Some(var), None) => format!("missing (set {} or provider.api_key)", var),
        }
    }

    pub fn to_model_provider(&self) -> Result<ModelProvider, ApiError> {
        let missing_key = || {
            ApiError::ProviderNotConfigured(format!(
                "No API key for {}. Set {} or provider.api_key in config.",
                provider_type_slug(self.provider_type),
                api_key_env_var(self.provider_type).unwrap_or(GENERIC_API_KEY_ENV)
            ))
        };

        Ok(match self.provider_type {
            ProviderType::OpenAI => ModelProvider::OpenAI {
                model: self.model.clone(),
                api_key: self.resolve_api_key().ok_or_else(missing_key)?,
                base_url: self.endpoint.clone(),
            },
            ProviderType::Anthropic => ModelProvider::Anthropic {
                model: self.model.clone(),
                api_key: self.resolve_api_key().ok_or_else(missing_key)?,
                base_url: self.endpoint.clone(),
            },
            ProviderType::Ollama => ModelProvider::Ollama {
                model: self.model.clone(),
                base_url: self.endpoint.clone(),
            },
            ProviderType::LocalCustom => ModelProvider::LocalCustom {
                model: self.model.clone(),
                endpoint: self.endpoint.clone().ok_or_else(|| {
                    ApiError::ProviderNotConfigured(
                        "Local provider requires provider.endpoint".to_string(),
                    )
                })?,
                api_key: self.resolve_api_key(),
            },
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
