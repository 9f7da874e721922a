//! Application startup and lifecycle management.

use crate::config::InvoicingConfig;
use crate::services::{
    init_metrics, DailySchedule, Database, EmailProvider, EntityMigration, SmtpProvider,
};
use crate::{build_router, AppState};
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Open the store, bring the schema up to date, backfill contacts, then bind.
    /// Nothing is served until all of that succeeded.
    pub async fn build(config: InvoicingConfig) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::connect(&config.database.url, config.database.max_connections)
            .await
            .map_err(|e| {
                tracing::error!("Failed to open database: {}", e);
                e
            })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;

        let report = EntityMigration::run(&db).await.map_err(|e| {
            tracing::error!("Entity backfill failed: {}", e);
            e
        })?;
        if report.pairs_failed > 0 {
            tracing::warn!(
                pairs_failed = report.pairs_failed,
                "Some legacy invoices were left unlinked"
            );
        }

        let email_provider: Arc<dyn EmailProvider> =
            Arc::new(SmtpProvider::new(config.smtp.clone()));
        let state = AppState::new(config.clone(), db, email_provider);

        let host: std::net::IpAddr = config.common.host.parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid host '{}': {}",
                config.common.host,
                e
            ))
        })?;
        let addr = SocketAddr::new(host, config.common.port);
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Invoicing service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until `shutdown` resolves, then stop the reminder schedule and close the store.
    pub async fn run_until_stopped<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);

        let scheduler = if self.state.config.reminder.enabled {
            let schedule = DailySchedule {
                hour: self.state.config.reminder.hour,
                minute: self.state.config.reminder.minute,
            };
            Some(schedule.spawn(self.state.notifier.clone(), stop_rx))
        } else {
            tracing::info!("Payment reminders disabled");
            None
        };

        let db = self.state.db.clone();
        let router = build_router(self.state);

        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await;

        let _ = stop_tx.send(true);
        if let Some(handle) = scheduler {
            if let Err(e) = handle.await {
                tracing::warn!("Reminder scheduler ended abnormally: {}", e);
            }
        }
        db.close().await;

        if let Err(e) = &result {
            tracing::error!("HTTP server error: {}", e);
        }
        result
    }
}
