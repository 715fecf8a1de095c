//! Subscriber installation.

use crate::config::LoggingConfig;
use crate::errors::ActorflowError;
use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber for `config`.
///
/// `RUST_LOG` overrides `config.level`. Fails if the level is not a valid
/// filter directive or a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ActorflowError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            ActorflowError::Resource(format!("Invalid log level '{}': {e}", config.level))
        })?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| ActorflowError::Resource(format!("Failed to install subscriber: {e}")))
}
