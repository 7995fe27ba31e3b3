//! Application state wiring the relay service together.
//!
//! `RelayService` is generic over its repository; AppState pins it to the
//! infra `TurnStore`.

use std::sync::Arc;

use parley_core::chat::service::{RelayOptions, RelayService};
use parley_core::llm::box_provider::BoxLlmProvider;
use parley_core::persona::PersonaBuilder;
use parley_infra::config::resolve_api_key;
use parley_infra::llm::create_provider;
use parley_infra::store::TurnStore;
use parley_types::config::RelayConfig;

pub type ConcreteRelayService = RelayService<TurnStore>;

/// Shared application state used by the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ConcreteRelayService>,
    pub store: TurnStore,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    /// Resolve the API key from the process environment, then connect.
    pub async fn init(config: RelayConfig) -> anyhow::Result<Self> {
        Self::init_with_env(config, |key| std::env::var(key).ok()).await
    }

    /// Build the provider first so a missing key never opens the store.
    pub async fn init_with_env(
        config: RelayConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let api_key = resolve_api_key(&config.provider, lookup);
        if api_key.is_none() {
            anyhow::bail!(
                "no API key found: set {} in the environment or in .env",
                config.provider.api_key_env
            );
        }
        let provider = create_provider(&config.provider, api_key)?;
        let store = TurnStore::connect(&config.database).await?;

        Ok(Self::new(store, provider, config))
    }

    /// Wire a state from already-built parts.
    pub fn new(store: TurnStore, provider: BoxLlmProvider, config: RelayConfig) -> Self {
        let persona = match config.chat.persona.as_deref() {
            Some(base) if !base.trim().is_empty() => PersonaBuilder::new(base.trim()),
            _ => PersonaBuilder::default(),
        };
        let options = RelayOptions {
            max_history_turns: config.chat.max_history_turns,
            max_tokens: config.provider.max_tokens,
            temperature: config.provider.temperature,
        };

        let relay = RelayService::new(store.clone(), provider, persona, options);

        Self {
            relay: Arc::new(relay),
            store,
            config: Arc::new(config),
        }
    }
}
