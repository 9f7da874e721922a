#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use invoicing_service::config::{
    DatabaseConfig, EmailOverrides, InvoicingConfig, ReminderConfig, SmtpConfig,
};
use invoicing_service::services::{init_metrics, Database, MockEmailProvider};
use invoicing_service::{build_router, AppState};
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestApp {
    pub state: AppState,
    pub email: Arc<MockEmailProvider>,
    router: Router,
}

pub fn test_config() -> InvoicingConfig {
    InvoicingConfig {
        common: CoreConfig::default(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        smtp: SmtpConfig::default(),
        email: EmailOverrides::default(),
        reminder: ReminderConfig {
            enabled: false,
            ..Default::default()
        },
    }
}

impl TestApp {
    /// Fresh in-memory store with the schema applied and a mock mailer.
    pub async fn spawn() -> Self {
        init_metrics();

        let db = Database::in_memory()
            .await
            .expect("Failed to open in-memory database");
        db.run_migrations().await.expect("Failed to run migrations");

        let email = Arc::new(MockEmailProvider::new());
        let state = AppState::new(test_config(), db, email.clone());
        let router = build_router(state.clone());

        TestApp {
            state,
            email,
            router,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request")
    }

    /// JSON request; returns the status and the parsed body (`Null` when empty).
    pub async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self.send(request).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.json(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json(Method::PUT, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.json(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.json(Method::DELETE, uri, None).await
    }

    /// Create an invoice through the API and return its id.
    pub async fn create_invoice(&self, body: Value) -> i64 {
        let (status, response) = self.post("/api/invoices", body).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", response);
        response["id"].as_i64().expect("Missing invoice id")
    }

    /// Create a contact through the API and return its id.
    pub async fn create_entity(&self, name: &str, entity_type: &str) -> i64 {
        let (status, response) = self
            .post(
                "/api/entities",
                serde_json::json!({ "name": name, "type": entity_type }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", response);
        response["id"].as_i64().expect("Missing entity id")
    }

    /// Insert an invoice the way the pre-contacts schema stored it: free text only.
    pub async fn insert_legacy_invoice(
        &self,
        number: &str,
        company: Option<&str>,
        distributor: Option<&str>,
        date: &str,
    ) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO invoices (invoice_number, company, distributor, date, total_amount, reminder_date)
            VALUES (?, ?, ?, ?, 100.0, date(?, '+10 days'))
            "#,
        )
        .bind(number)
        .bind(company)
        .bind(distributor)
        .bind(date)
        .bind(date)
        .execute(self.db().pool())
        .await
        .expect("Failed to insert legacy invoice")
        .last_insert_rowid()
    }

    /// `(company_id, distributor_id)` of an invoice row.
    pub async fn invoice_links(&self, id: i64) -> (Option<i64>, Option<i64>) {
        sqlx::query_as("SELECT company_id, distributor_id FROM invoices WHERE id = ?")
            .bind(id)
            .fetch_one(self.db().pool())
            .await
            .expect("Failed to read invoice links")
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.db().pool())
            .await
            .expect("Failed to count rows")
    }
}
