use super::MonthQuery;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use service_core::error::AppError;

#[derive(Debug, Serialize)]
pub struct ProfitSummary {
    pub month: u32,
    pub year: i32,
    pub total_sales: f64,
    pub total_purchases: f64,
    pub profit: f64,
}

/// Sales from the cash-flow ledger minus invoice purchases for one month.
pub async fn profit_summary(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<ProfitSummary>, AppError> {
    let period = query.period()?;
    let total_sales = state.cash_flow.monthly_total(period).await?;
    let total_purchases = state.invoices.monthly_total(period).await?;

    Ok(Json(ProfitSummary {
        month: period.month,
        year: period.year,
        total_sales,
        total_purchases,
        profit: total_sales - total_purchases,
    }))
}
