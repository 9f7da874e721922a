use super::{iso_date, validate_iso_date, MessageResponse, MonthQuery};
use crate::models::{CashFlowEntry, UpsertCashFlow};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertCashFlowRequest {
    #[validate(custom(function = "validate_iso_date"))]
    pub date: String,
    #[validate(range(min = 0.0, message = "Cash amount cannot be negative"))]
    pub cash_amount: Option<f64>,
    #[validate(range(min = 0.0, message = "UPI amount cannot be negative"))]
    pub upi_amount: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SalesSummary {
    pub total_sales: f64,
}

pub async fn list_cash_flow(
    State(state): State<AppState>,
) -> Result<Json<Vec<CashFlowEntry>>, AppError> {
    Ok(Json(state.cash_flow.list().await?))
}

pub async fn get_cash_flow_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<CashFlowEntry>, AppError> {
    let date = iso_date(&date)?;
    Ok(Json(state.cash_flow.get_by_date(date).await?))
}

#[tracing::instrument(skip(state, request))]
pub async fn upsert_cash_flow(
    State(state): State<AppState>,
    Json(request): Json<UpsertCashFlowRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    request.validate()?;

    let input = UpsertCashFlow {
        date: iso_date(&request.date)?,
        cash_amount: request.cash_amount.unwrap_or(0.0),
        upi_amount: request.upi_amount.unwrap_or(0.0),
    };
    state.cash_flow.upsert(&input).await?;
    Ok(Json(MessageResponse::new("Saved")))
}

#[tracing::instrument(skip(state))]
pub async fn delete_cash_flow(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let date = iso_date(&date)?;
    state.cash_flow.delete(date).await?;
    Ok(Json(MessageResponse::new("Deleted")))
}

pub async fn monthly_sales(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<SalesSummary>, AppError> {
    let total_sales = state.cash_flow.monthly_total(query.period()?).await?;
    Ok(Json(SalesSummary { total_sales }))
}
