use async_trait::async_trait;
use thiserror::Error;

use barberia_core::errors::{ApplicationError, DomainError};

pub mod appointment;
pub mod catalog;
pub mod kv_entry;
pub mod memory;

pub use appointment::AppointmentStore;
pub use catalog::{Catalog, ServiceDraft};
pub use kv_entry::SqlKeyValueStore;
pub use memory::InMemoryKeyValueStore;

/// Key holding the shop configuration and service list.
pub const CATALOG_KEY: &str = "barber-config";
/// Key holding the full appointment list.
pub const APPOINTMENTS_KEY: &str = "barber-appointments";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("decode error for `{key}`: {message}")]
    Decode { key: String, message: String },
    #[error("encode error for `{key}`: {message}")]
    Encode { key: String, message: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Domain(error) => Self::Domain(error),
            other => Self::Persistence(other.to_string()),
        }
    }
}

/// Opaque text store. Values are whole JSON documents; there is no partial update.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError>;
}

pub(crate) async fn load_json<T>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, RepositoryError>
where
    T: serde::de::DeserializeOwned,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|error| RepositoryError::Decode { key: key.to_string(), message: error.to_string() })
}

pub(crate) async fn save_json<T>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), RepositoryError>
where
    T: serde::Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)
        .map_err(|error| RepositoryError::Encode { key: key.to_string(), message: error.to_string() })?;
    store.set(key, &raw).await
}
