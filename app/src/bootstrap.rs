//! Resource setup: database pool, identity protector, metrics exporter, and
//! the engine wired on top of them.

use crate::config::{Config, ConfigError, PostgresConfig};
use lotto_core::environment::SystemClock;
use lotto_core::error::StoreError;
use lotto_identity::{IdentityError, PhoneIdentityProtector};
use lotto_postgres::PostgresLottoStore;
use lotto_runtime::LottoService;
use lotto_runtime::metrics::{MetricsError, MetricsServer};
use lotto_runtime::retry::RetryPolicy;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// The production engine.
pub type ProductionService = LottoService<PostgresLottoStore, PhoneIdentityProtector, SystemClock>;

/// Errors raised while bringing resources up.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Configuration is incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection or migration failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Identity secrets are unusable.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// Metrics exporter could not start.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

/// Open a connection pool with the configured limits.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if the database cannot be reached.
pub async fn connect(config: &PostgresConfig) -> Result<PostgresLottoStore, StoreError> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to database..."
    );
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
        .connect(&config.url)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;
    info!("Database connected");

    Ok(PostgresLottoStore::from_pool(pool))
}

/// Build the phone identity protector from the configured secrets.
///
/// # Errors
///
/// Returns error if a secret is missing or the cipher rejects the key.
pub fn identity_protector(config: &Config) -> Result<PhoneIdentityProtector, BootstrapError> {
    let (pepper, key) = config.identity.secrets()?;
    Ok(PhoneIdentityProtector::new(pepper, key)?)
}

/// Start the Prometheus exporter if an address is configured.
///
/// # Errors
///
/// Returns [`MetricsError`] if the exporter cannot bind or install.
pub fn start_metrics(config: &Config) -> Result<Option<MetricsServer>, MetricsError> {
    let Some(addr) = config.metrics_addr else {
        return Ok(None);
    };
    let mut server = MetricsServer::new(addr);
    server.start()?;
    Ok(Some(server))
}

/// Engine over an already-connected store, shaped by `config`.
///
/// # Errors
///
/// Returns error if the identity secrets are missing or unusable.
pub fn service(config: &Config, store: PostgresLottoStore) -> Result<ProductionService, BootstrapError> {
    let identity = identity_protector(config)?;
    let retry = RetryPolicy::builder()
        .max_attempts(config.register_max_attempts)
        .build();

    Ok(LottoService::new(store, identity, SystemClock)
        .with_pool_config(config.pool)
        .with_eligibility(config.eligibility)
        .with_retry_policy(retry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protector_requires_both_secrets() {
        let mut config = Config::from_lookup(|_| None).unwrap();
        assert!(matches!(
            identity_protector(&config),
            Err(BootstrapError::Config(ConfigError::Missing("LOTTO_PHONE_PEPPER")))
        ));

        config.identity.pepper = Some("pepper".to_string());
        assert!(matches!(
            identity_protector(&config),
            Err(BootstrapError::Config(ConfigError::Missing("LOTTO_PHONE_ENCRYPT_KEY")))
        ));

        config.identity.encrypt_key = Some("key".to_string());
        assert!(identity_protector(&config).is_ok());
    }

    #[test]
    fn metrics_stay_off_without_address() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert!(start_metrics(&config).unwrap().is_none());
    }
}
