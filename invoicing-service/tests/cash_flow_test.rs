//! Daily cash-flow ledger and profit summary integration tests.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn unrecorded_day_returns_zeroed_placeholder() {
    let app = TestApp::spawn().await;

    let (status, entry) = app.get("/api/cashflow/date/2025-03-20").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry, json!({ "date": "2025-03-20", "cash_amount": 0.0, "upi_amount": 0.0 }));
}

#[tokio::test]
async fn upsert_overwrites_rather_than_adds() {
    let app = TestApp::spawn().await;

    app.post(
        "/api/cashflow",
        json!({ "date": "2025-03-20", "cash_amount": 100, "upi_amount": 50 }),
    )
    .await;
    let (status, body) = app
        .post(
            "/api/cashflow",
            json!({ "date": "2025-03-20", "cash_amount": 30, "upi_amount": 20 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Saved");

    let (_, entry) = app.get("/api/cashflow/date/2025-03-20").await;
    assert_eq!(entry["cash_amount"], 30.0);
    assert_eq!(entry["upi_amount"], 20.0);
    assert!(entry["id"].is_i64());
    assert_eq!(app.count("cash_flow").await, 1);
}

#[tokio::test]
async fn missing_amounts_default_to_zero_and_negatives_are_rejected() {
    let app = TestApp::spawn().await;

    let (status, _) = app
        .post("/api/cashflow", json!({ "date": "2025-03-20", "upi_amount": 75.5 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, entry) = app.get("/api/cashflow/date/2025-03-20").await;
    assert_eq!(entry["cash_amount"], 0.0);
    assert_eq!(entry["upi_amount"], 75.5);

    let (status, _) = app
        .post("/api/cashflow", json!({ "date": "2025-03-21", "cash_amount": -1 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post("/api/cashflow", json!({ "date": "21/03/2025", "cash_amount": 1 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn list_is_newest_first_and_delete_is_idempotent() {
    let app = TestApp::spawn().await;
    for date in ["2025-03-01", "2025-03-15", "2025-02-28"] {
        app.post("/api/cashflow", json!({ "date": date, "cash_amount": 10 }))
            .await;
    }

    let (_, entries) = app.get("/api/cashflow").await;
    let dates: Vec<&str> = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2025-03-15", "2025-03-01", "2025-02-28"]);

    let (status, _) = app.delete("/api/cashflow/2025-03-15").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete("/api/cashflow/2025-03-15").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.count("cash_flow").await, 2);
}

#[tokio::test]
async fn monthly_sales_sum_cash_and_upi_within_month() {
    let app = TestApp::spawn().await;
    let entries = [
        ("2025-03-01", 100.0, 50.0),
        ("2025-03-31", 10.0, 5.5),
        ("2025-04-01", 999.0, 0.0),
        ("2025-02-28", 999.0, 0.0),
    ];
    for (date, cash, upi) in entries {
        app.post(
            "/api/cashflow",
            json!({ "date": date, "cash_amount": cash, "upi_amount": upi }),
        )
        .await;
    }

    let (status, body) = app.get("/api/cashflow/summary/monthly?month=3&year=2025").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_sales"], 165.5);

    let (_, empty) = app.get("/api/cashflow/summary/monthly?month=7&year=2025").await;
    assert_eq!(empty["total_sales"], 0.0);
}

#[tokio::test]
async fn profit_is_sales_minus_purchases() {
    let app = TestApp::spawn().await;
    app.post(
        "/api/cashflow",
        json!({ "date": "2025-03-10", "cash_amount": 300, "upi_amount": 200 }),
    )
    .await;
    app.create_invoice(json!({
        "invoice_number": "P-1",
        "date": "2025-03-05",
        "items": [{ "item_name": "Stock", "quantity": 4, "price": 30 }]
    }))
    .await;

    let (status, summary) = app.get("/api/summary/profit?month=3&year=2025").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["month"], 3);
    assert_eq!(summary["year"], 2025);
    assert_eq!(summary["total_sales"], 500.0);
    assert_eq!(summary["total_purchases"], 120.0);
    assert_eq!(summary["profit"], 380.0);

    let (status, _) = app.get("/api/summary/profit?month=3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
