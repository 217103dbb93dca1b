pub mod chat;
pub mod config;
pub mod migrate;
pub mod week;

use std::sync::Arc;

use barberia_core::config::{AppConfig, LoadOptions};
use barberia_db::{
    connect_with_settings, migrations, AppointmentStore, Catalog, DbPool, KeyValueStore,
    SqlKeyValueStore,
};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Error class, message and exit code of a failed step.
pub(crate) type StepFailure = (&'static str, String, u8);

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", format!("configuration issue: {error}"), 2)
    })
}

pub(crate) fn runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

pub(crate) async fn open_pool(config: &AppConfig) -> Result<DbPool, StepFailure> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

pub(crate) struct Stores {
    pub pool: DbPool,
    pub catalog: Arc<Catalog>,
    pub appointments: Arc<AppointmentStore>,
}

pub(crate) async fn open_stores(config: &AppConfig) -> Result<Stores, StepFailure> {
    let pool = open_pool(config).await?;
    let store: Arc<dyn KeyValueStore> = Arc::new(SqlKeyValueStore::new(pool.clone()));
    let catalog = Catalog::load(store.clone())
        .await
        .map_err(|error| ("storage_decode", error.to_string(), 6u8))?;
    let appointments = AppointmentStore::load(store)
        .await
        .map_err(|error| ("storage_decode", error.to_string(), 6u8))?;
    Ok(Stores { pool, catalog: Arc::new(catalog), appointments: Arc::new(appointments) })
}
