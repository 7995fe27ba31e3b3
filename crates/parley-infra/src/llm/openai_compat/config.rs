//! Configuration for the OpenAI-compatible provider.

use std::time::Duration;

use parley_types::config::ProviderSettings;
use secrecy::SecretString;

/// Everything needed to construct an [`super::OpenAiCompatibleProvider`].
///
/// Deliberately not `Debug`: it carries the API key.
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "openai").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    pub base_url: String,
    pub api_key: SecretString,
    /// Model used when a request does not name one.
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    /// Per-call bound; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl OpenAiCompatConfig {
    pub fn from_settings(settings: &ProviderSettings, api_key: SecretString) -> Self {
        Self {
            provider_name: settings.name.clone(),
            base_url: settings.base_url.clone(),
            api_key,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: (settings.timeout_secs > 0).then(|| Duration::from_secs(settings.timeout_secs)),
        }
    }
}
