//! Completion provider implementations.
//!
//! Also provides the provider factory ([`create_provider`]) that turns
//! [`ProviderSettings`] plus a resolved API key into a [`BoxLlmProvider`].

pub mod openai_compat;

use secrecy::SecretString;

use parley_core::llm::box_provider::BoxLlmProvider;
use parley_types::config::ProviderSettings;
use parley_types::llm::LlmError;

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config::OpenAiCompatConfig;

/// Create a [`BoxLlmProvider`] from provider settings.
///
/// # Errors
///
/// Returns [`LlmError::AuthenticationFailed`] when no API key was resolved.
pub fn create_provider(
    settings: &ProviderSettings,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    let key = api_key.ok_or(LlmError::AuthenticationFailed)?;
    let provider = OpenAiCompatibleProvider::new(OpenAiCompatConfig::from_settings(settings, key));
    Ok(BoxLlmProvider::new(provider))
}
