//! Start-up helpers: configuration loading, logging and secret resolution.

use std::{sync::Arc, time::Duration};
use ticket_bridge_api::{LoggingConfig, ParameterStoreConfig, ServiceConfig};
use ticket_bridge_core::{
    adapters::{EnvironmentSource, SsmParameterSource},
    SecretResolver,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable naming an extra configuration file.
pub const CONFIG_FILE_ENV: &str = "TB_CONFIG_FILE";

/// Prefix for configuration overrides, e.g. `TB__SERVER__PORT=9090`.
pub const ENV_PREFIX: &str = "TB";

/// Configuration files consulted on every start, lowest precedence first.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["/etc/ticket-bridge/service", "config/service"];

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error(transparent)]
    Invalid(#[from] ticket_bridge_api::ConfigError),
}

/// Load and validate the service configuration.
///
/// Sources (applied in order, later sources override earlier ones):
///  1. each of `search_paths` as an optional YAML file
///  2. `explicit_path`, which must exist when given
///  3. environment variables prefixed `TB__` (double-underscore separator)
///
/// Every field has a default, so no file at all yields a valid configuration.
/// A malformed file or an override that cannot be coerced is an error.
pub fn load_service_config(
    search_paths: &[&str],
    explicit_path: Option<&str>,
) -> Result<ServiceConfig, BootstrapError> {
    let mut builder = config::Config::builder();

    for path in search_paths {
        builder = builder.add_source(
            config::File::with_name(path)
                .required(false)
                .format(config::FileFormat::Yaml),
        );
    }

    if let Some(path) = explicit_path.filter(|p| !p.is_empty()) {
        builder = builder.add_source(
            config::File::with_name(path)
                .required(true)
                .format(config::FileFormat::Yaml),
        );
    }

    let service_config: ServiceConfig = builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize()?;

    service_config.validate()?;
    Ok(service_config)
}

/// Default `EnvFilter` directives for a log level.
pub fn default_filter(level: &str) -> String {
    format!(
        "ticket_bridge_service={level},ticket_bridge_api={level},ticket_bridge_core={level},tower_http=debug"
    )
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    // A subscriber may already be installed (tests); keep the existing one.
    let _ = if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
}

/// Build the secret resolver: parameter store first (when enabled), then the
/// process environment.
pub async fn build_resolver(parameter_store: &ParameterStoreConfig) -> SecretResolver {
    let mut resolver = SecretResolver::new();

    if parameter_store.enabled {
        let source = SsmParameterSource::from_env(
            parameter_store.region.clone(),
            Duration::from_secs(parameter_store.timeout_seconds),
        )
        .await;
        resolver = resolver.with_source(Arc::new(source));
    }

    let resolver = resolver.with_source(Arc::new(EnvironmentSource::with_standard_aliases()));
    info!(sources = ?resolver.source_names(), "Configured secret sources");
    resolver
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
