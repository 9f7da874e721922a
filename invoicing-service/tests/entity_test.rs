//! Contact (entity) API integration tests for invoicing-service.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

fn names(body: &serde_json::Value) -> Vec<String> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn create_returns_active_entity() {
    let app = TestApp::spawn().await;

    let (status, entity) = app
        .post("/api/entities", json!({ "name": "Acme Traders", "type": "company" }))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entity["name"], "Acme Traders");
    assert_eq!(entity["type"], "company");
    assert_eq!(entity["is_active"], true);
}

#[tokio::test]
async fn duplicate_name_is_a_conflict() {
    let app = TestApp::spawn().await;
    app.create_entity("Acme Traders", "company").await;

    let (status, body) = app
        .post("/api/entities", json!({ "name": "Acme Traders", "type": "distributor" }))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn invalid_type_or_blank_name_is_a_validation_error() {
    let app = TestApp::spawn().await;

    let (status, _) = app
        .post("/api/entities", json!({ "name": "Acme", "type": "vendor" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .post("/api/entities", json!({ "name": "", "type": "company" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.get("/api/entities?type=vendor").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn role_views_include_both_and_sort_by_name() {
    let app = TestApp::spawn().await;
    app.create_entity("Zeta Co", "company").await;
    app.create_entity("Metro Supply", "distributor").await;
    app.create_entity("Alpha Wholesale", "both").await;

    let (_, companies) = app.get("/api/entities/companies").await;
    assert_eq!(names(&companies), vec!["Alpha Wholesale", "Zeta Co"]);

    let (_, distributors) = app.get("/api/entities/distributors").await;
    assert_eq!(names(&distributors), vec!["Alpha Wholesale", "Metro Supply"]);

    let (_, only_companies) = app.get("/api/entities?type=company").await;
    assert_eq!(names(&only_companies), vec!["Zeta Co"]);

    let (_, all) = app.get("/api/entities").await;
    assert_eq!(names(&all), vec!["Alpha Wholesale", "Metro Supply", "Zeta Co"]);
}

#[tokio::test]
async fn update_renames_and_detects_conflicts() {
    let app = TestApp::spawn().await;
    let acme = app.create_entity("Acme", "company").await;
    app.create_entity("Metro", "distributor").await;

    let (status, entity) = app
        .put(&format!("/api/entities/{}", acme), json!({ "name": "Acme Ltd", "type": "both" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entity["name"], "Acme Ltd");
    assert_eq!(entity["type"], "both");

    let (status, _) = app
        .put(&format!("/api/entities/{}", acme), json!({ "name": "Metro", "type": "both" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .put("/api/entities/999", json!({ "name": "Ghost", "type": "company" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_referenced_entity_only_deactivates_it() {
    let app = TestApp::spawn().await;
    let acme = app.create_entity("Acme", "company").await;
    let invoice = app
        .create_invoice(json!({
            "invoice_number": "INV-1",
            "company_id": acme,
            "date": "2025-03-20",
            "items": []
        }))
        .await;

    let (status, body) = app.delete(&format!("/api/entities/{}", acme)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deactivated"], true);
    assert!(body.get("deleted").is_none());

    // Hidden from listings, still resolvable by id and from its invoices.
    let (_, companies) = app.get("/api/entities/companies").await;
    assert!(companies.as_array().unwrap().is_empty());

    let (status, entity) = app.get(&format!("/api/entities/{}", acme)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entity["is_active"], false);

    assert_eq!(app.invoice_links(invoice).await, (Some(acme), None));
    let (_, inv) = app.get(&format!("/api/invoices/{}", invoice)).await;
    assert_eq!(inv["company_name"], "Acme");
}

#[tokio::test]
async fn deleting_unreferenced_entity_removes_it() {
    let app = TestApp::spawn().await;
    let metro = app.create_entity("Metro", "distributor").await;

    let (status, body) = app.delete(&format!("/api/entities/{}", metro)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);
    assert_eq!(body["message"], "Entity deleted");

    let (status, _) = app.get(&format!("/api/entities/{}", metro)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.count("entities").await, 0);

    let (status, _) = app.delete(&format!("/api/entities/{}", metro)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn distributor_reference_also_blocks_hard_delete() {
    let app = TestApp::spawn().await;
    let metro = app.create_entity("Metro", "distributor").await;
    app.create_invoice(json!({
        "invoice_number": "INV-1",
        "distributor_id": metro,
        "date": "2025-03-20",
        "items": []
    }))
    .await;

    let removal = app.state.entities.delete(metro).await.unwrap();
    assert_eq!(removal, invoicing_service::models::EntityRemoval::Deactivated);
    assert_eq!(app.count("entities").await, 1);
}
