//! Daily cash/UPI receipt model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One day's takings. `id` is absent for the zeroed placeholder of an unrecorded day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CashFlowEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub cash_amount: f64,
    pub upi_amount: f64,
}

impl CashFlowEntry {
    pub fn placeholder(date: NaiveDate) -> Self {
        Self {
            id: None,
            date,
            cash_amount: 0.0,
            upi_amount: 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.cash_amount + self.upi_amount
    }
}

/// Input for recording a day's takings; replaces any earlier amounts for that date.
#[derive(Debug, Clone)]
pub struct UpsertCashFlow {
    pub date: NaiveDate,
    pub cash_amount: f64,
    pub upi_amount: f64,
}
