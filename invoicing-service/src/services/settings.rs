//! Key/value settings store.

use crate::models::Setting;
use crate::services::database::{db_error, Database};
use service_core::error::AppError;
use std::collections::BTreeMap;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct SettingsService {
    db: Database,
}

impl SettingsService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Every setting as a key/value map.
    #[instrument(skip(self))]
    pub async fn all(&self) -> Result<BTreeMap<String, Option<String>>, AppError> {
        let rows = sqlx::query_as::<_, Setting>("SELECT key, value FROM settings")
            .fetch_all(self.db.pool())
            .await
            .map_err(db_error("list settings"))?;

        Ok(rows.into_iter().map(|s| (s.key, s.value)).collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
                .bind(key)
                .fetch_optional(self.db.pool())
                .await
                .map_err(db_error("get setting"))?;

        Ok(value.flatten())
    }

    /// Values are not logged; some hold credentials.
    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: Option<&str>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(self.db.pool())
        .await
        .map_err(db_error("save setting"))?;

        info!(key = key, "Setting saved");
        Ok(())
    }
}
