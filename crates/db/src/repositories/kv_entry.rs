use chrono::Utc;

use super::{KeyValueStore, RepositoryError};
use crate::DbPool;

pub struct SqlKeyValueStore {
    pool: DbPool,
}

impl SqlKeyValueStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for SqlKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM kv_entry WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO kv_entry (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::SqlKeyValueStore;
    use crate::repositories::{KeyValueStore, RepositoryError};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn sql_store_upserts_by_key() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        let store = SqlKeyValueStore::new(pool.clone());

        assert_eq!(store.get("barber-appointments").await.expect("get"), None);
        store.set("barber-appointments", "[]").await.expect("insert");
        store.set("barber-appointments", "[{\"id\":1}]").await.expect("update");

        assert_eq!(
            store.get("barber-appointments").await.expect("get"),
            Some("[{\"id\":1}]".to_string())
        );
        pool.close().await;
    }

    #[tokio::test]
    async fn sql_store_survives_reconnect() {
        let dir = TempDir::new().expect("tempdir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("barberia.db").display());

        let pool = connect_with_settings(&url, 2, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlKeyValueStore::new(pool.clone()).set("barber-config", "{}").await.expect("set");
        pool.close().await;

        let pool = connect_with_settings(&url, 2, 5).await.expect("reconnect");
        let value = SqlKeyValueStore::new(pool.clone()).get("barber-config").await.expect("get");
        assert_eq!(value, Some("{}".to_string()));
        pool.close().await;
    }

    #[tokio::test]
    async fn sql_store_reports_closed_pool() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        pool.close().await;

        let error = SqlKeyValueStore::new(pool).set("k", "v").await.expect_err("closed pool");
        assert!(matches!(error, RepositoryError::Database(_)));
    }
}
