//! Store handle for invoicing-service.
//!
//! Opened once at startup and passed to each service; closed on shutdown.

use service_core::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the SQLite database at `database_url`.
    #[instrument(skip(database_url), fields(service = "invoicing-service"))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        info!(max_connections = max_connections, "Opening SQLite database");

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid DATABASE_URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("SQLite connection pool established");

        Ok(Self { pool })
    }

    /// Private in-memory database. A single connection that never idles out, since
    /// each SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Apply the versioned schema migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        self.ensure_contact_links().await?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Add the invoice -> entity link columns unless the data file already has them.
    async fn ensure_contact_links(&self) -> Result<(), AppError> {
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('invoices')")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("inspect invoices columns"))?;

        for column in ["company_id", "distributor_id"] {
            if columns.iter().any(|c| c == column) {
                continue;
            }
            sqlx::query(&format!(
                "ALTER TABLE invoices ADD COLUMN {column} INTEGER REFERENCES entities(id)"
            ))
            .execute(&self.pool)
            .await
            .map_err(db_error("add invoice link column"))?;
            info!(column = column, "Added invoice link column");
        }

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_invoices_company_id ON invoices(company_id)",
            "CREATE INDEX IF NOT EXISTS idx_invoices_distributor_id ON invoices(distributor_id)",
        ] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error("index invoice link columns"))?;
        }
        Ok(())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("SQLite connection pool closed");
    }
}

/// Wrap a store failure with the operation that hit it.
pub(crate) fn db_error(operation: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", operation, e))
}
