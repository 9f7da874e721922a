//! Probe and middleware integration tests.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::TestApp;
use service_core::middleware::tracing::REQUEST_ID_HEADER;

#[tokio::test]
async fn health_check_works() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "invoicing-service");
}

#[tokio::test]
async fn readiness_check_works() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get("/ready").await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn metrics_exposes_service_counters() {
    let app = TestApp::spawn().await;
    app.create_invoice(serde_json::json!({
        "invoice_number": "M",
        "date": "2025-03-01",
        "items": []
    }))
    .await;

    let (status, body) = app.get("/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("invoicing_invoices_total"));
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::spawn().await;

    let response = app
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;

    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}
