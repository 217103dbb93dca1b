use std::sync::Arc;
use std::time::Duration;

use barberia_agent::{BookingOrchestrator, CompletionClient, CompletionError, ProxyCompletionClient};
use barberia_core::config::{AppConfig, ConfigError, LoadOptions};
use barberia_db::{
    connect_with_settings, migrations, AppointmentStore, Catalog, DbPool, KeyValueStore,
    RepositoryError, SqlKeyValueStore,
};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub orchestrator: Arc<BookingOrchestrator>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("stored data could not be loaded: {0}")]
    Load(#[source] RepositoryError),
    #[error("completion client could not be built: {0}")]
    Completion(#[source] CompletionError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let store: Arc<dyn KeyValueStore> = Arc::new(SqlKeyValueStore::new(db_pool.clone()));
    let catalog = Arc::new(Catalog::load(store.clone()).await.map_err(BootstrapError::Load)?);
    let appointments =
        Arc::new(AppointmentStore::load(store).await.map_err(BootstrapError::Load)?);

    let turn_timeout = Duration::from_secs(config.llm.timeout_secs);
    let completion: Arc<dyn CompletionClient> = Arc::new(
        ProxyCompletionClient::new(config.llm.endpoint.clone(), turn_timeout)
            .map_err(BootstrapError::Completion)?,
    );

    if !config.llm.has_credential() {
        warn!(
            event_name = "system.bootstrap.missing_credential",
            correlation_id = "bootstrap",
            "no api key configured; chat turns will answer with a configuration hint"
        );
    }

    let orchestrator = BookingOrchestrator::new(
        catalog,
        appointments,
        completion,
        config.llm.api_key.clone(),
    )
    .with_turn_timeout(turn_timeout);

    Ok(Application { config, db_pool, orchestrator: Arc::new(orchestrator) })
}
