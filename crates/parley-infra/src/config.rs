//! Configuration loader for Parley.
//!
//! Reads a TOML file into [`RelayConfig`], then layers environment
//! overrides on top. A missing file means defaults; a malformed one is an
//! error. The provider API key only ever comes from the environment.

use std::path::{Path, PathBuf};

use parley_types::config::{ProviderSettings, RelayConfig};
use parley_types::error::ConfigError;
use secrecy::SecretString;

use crate::store::Backend;

/// Environment variables that override file values.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_ALLOWED_ORIGIN: &str = "PARLEY_ALLOWED_ORIGIN";
pub const ENV_HOST: &str = "PARLEY_HOST";
pub const ENV_PORT: &str = "PARLEY_PORT";
pub const ENV_MODEL: &str = "PARLEY_MODEL";

/// Load `.env` from the working directory (or a parent) into the process
/// environment. Returns the file used, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenv::dotenv().ok()
}

/// Load configuration from `path` and the process environment.
pub async fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let mut config = read_config_file(path).await?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Parse the TOML file at `path`; [`RelayConfig::default()`] if it does not exist.
pub async fn read_config_file(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(RelayConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                reason: err.to_string(),
            });
        }
    };

    toml::from_str::<RelayConfig>(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        reason: err.to_string(),
    })
}

/// Apply environment overrides; blank values are ignored.
pub fn apply_env_overrides(
    config: &mut RelayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(ENV_DATABASE_URL) {
        config.database.url = url;
    }
    if let Some(origin) = get(ENV_ALLOWED_ORIGIN) {
        config.server.allowed_origin = origin;
    }
    if let Some(host) = get(ENV_HOST) {
        config.server.host = host;
    }
    if let Some(port) = get(ENV_PORT) {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{ENV_PORT} is not a port: '{port}'")))?;
    }
    if let Some(model) = get(ENV_MODEL) {
        config.provider.model = model;
    }
    Ok(())
}

/// Reject values that would only fail later at startup.
pub fn validate(config: &RelayConfig) -> Result<(), ConfigError> {
    Backend::from_url(&config.database.url)?;

    let origin = config.server.allowed_origin.trim();
    if !(origin.starts_with("http://") || origin.starts_with("https://")) || origin.ends_with('/') {
        return Err(ConfigError::Invalid(format!(
            "allowed_origin must be a scheme://host[:port] origin, got '{origin}'"
        )));
    }
    if config.provider.model.trim().is_empty() {
        return Err(ConfigError::Invalid("provider.model must not be empty".to_string()));
    }
    Ok(())
}

/// Read the provider API key from the variable named by `api_key_env`.
pub fn resolve_api_key(
    settings: &ProviderSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<SecretString> {
    lookup(&settings.api_key_env)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .map(SecretString::from)
}
