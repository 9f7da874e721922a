pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use service_core::axum::{
    middleware::from_fn,
    routing::{delete, get, patch, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{request_id_middleware, RequestId},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::InvoicingConfig;
use crate::services::{
    CashFlowService, Database, EntityService, InvoiceService, ReminderNotifier, SettingsService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: InvoicingConfig,
    pub db: Database,
    pub invoices: InvoiceService,
    pub entities: EntityService,
    pub cash_flow: CashFlowService,
    pub settings: SettingsService,
    pub notifier: Arc<ReminderNotifier>,
}

impl AppState {
    /// Wire every service onto one store handle.
    pub fn new(
        config: InvoicingConfig,
        db: Database,
        email_provider: Arc<dyn services::EmailProvider>,
    ) -> Self {
        let invoices = InvoiceService::new(db.clone());
        let settings = SettingsService::new(db.clone());
        let notifier = Arc::new(ReminderNotifier::new(
            invoices.clone(),
            settings.clone(),
            email_provider,
            config.email.clone(),
        ));

        Self {
            entities: EntityService::new(db.clone()),
            cash_flow: CashFlowService::new(db.clone()),
            invoices,
            settings,
            notifier,
            config,
            db,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    use handlers::{cash_flow, entities, invoices, reminders, settings, summary};

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        // Invoices
        .route(
            "/api/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route("/api/invoices/export/csv", get(invoices::export_csv))
        .route(
            "/api/invoices/summary/monthly",
            get(invoices::monthly_purchases),
        )
        .route(
            "/api/invoices/:id",
            get(invoices::get_invoice).delete(invoices::delete_invoice),
        )
        .route("/api/invoices/:id/paid", patch(invoices::set_paid))
        .route("/api/invoices/:id/share", get(invoices::share_invoice))
        // Cash flow
        .route(
            "/api/cashflow",
            get(cash_flow::list_cash_flow).post(cash_flow::upsert_cash_flow),
        )
        .route(
            "/api/cashflow/summary/monthly",
            get(cash_flow::monthly_sales),
        )
        .route(
            "/api/cashflow/date/:date",
            get(cash_flow::get_cash_flow_by_date),
        )
        .route(
            "/api/cashflow/:date",
            delete(cash_flow::delete_cash_flow),
        )
        .route("/api/summary/profit", get(summary::profit_summary))
        // Entities
        .route(
            "/api/entities",
            get(entities::list_entities).post(entities::create_entity),
        )
        .route("/api/entities/companies", get(entities::list_companies))
        .route(
            "/api/entities/distributors",
            get(entities::list_distributors),
        )
        .route("/api/entities/migrate", post(entities::migrate_entities))
        .route(
            "/api/entities/:id",
            get(entities::get_entity)
                .put(entities::update_entity)
                .delete(entities::delete_entity),
        )
        // Settings
        .route(
            "/api/settings",
            get(settings::list_settings).post(settings::upsert_setting),
        )
        .route("/api/settings/:key", get(settings::get_setting))
        .route("/api/reminders/run", post(reminders::run_reminders))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        // The bundled UI is served from another origin during development.
        .layer(CorsLayer::permissive())
}
