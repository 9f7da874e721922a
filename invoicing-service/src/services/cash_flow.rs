//! Daily cash-flow ledger.

use crate::models::{CashFlowEntry, MonthPeriod, UpsertCashFlow};
use crate::services::database::{db_error, Database};
use chrono::NaiveDate;
use service_core::error::AppError;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct CashFlowService {
    db: Database,
}

impl CashFlowService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All recorded days, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<CashFlowEntry>, AppError> {
        sqlx::query_as::<_, CashFlowEntry>(
            "SELECT id, date, cash_amount, upi_amount FROM cash_flow ORDER BY date DESC",
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(db_error("list cash flow"))
    }

    /// The entry for `date`, or a zeroed placeholder when nothing was recorded.
    #[instrument(skip(self))]
    pub async fn get_by_date(&self, date: NaiveDate) -> Result<CashFlowEntry, AppError> {
        let entry = sqlx::query_as::<_, CashFlowEntry>(
            "SELECT id, date, cash_amount, upi_amount FROM cash_flow WHERE date = ?",
        )
        .bind(date)
        .fetch_optional(self.db.pool())
        .await
        .map_err(db_error("get cash flow entry"))?;

        Ok(entry.unwrap_or_else(|| CashFlowEntry::placeholder(date)))
    }

    /// Last write wins: amounts replace, never add to, an existing entry for the date.
    #[instrument(skip(self, input), fields(date = %input.date))]
    pub async fn upsert(&self, input: &UpsertCashFlow) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO cash_flow (date, cash_amount, upi_amount)
            VALUES (?, ?, ?)
            ON CONFLICT(date) DO UPDATE SET
                cash_amount = excluded.cash_amount,
                upi_amount = excluded.upi_amount
            "#,
        )
        .bind(input.date)
        .bind(input.cash_amount)
        .bind(input.upi_amount)
        .execute(self.db.pool())
        .await
        .map_err(db_error("save cash flow entry"))?;

        info!(
            cash_amount = input.cash_amount,
            upi_amount = input.upi_amount,
            "Cash flow entry saved"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, date: NaiveDate) -> Result<(), AppError> {
        sqlx::query("DELETE FROM cash_flow WHERE date = ?")
            .bind(date)
            .execute(self.db.pool())
            .await
            .map_err(db_error("delete cash flow entry"))?;
        Ok(())
    }

    /// Total sales (cash + UPI) for a month.
    #[instrument(skip(self))]
    pub async fn monthly_total(&self, period: MonthPeriod) -> Result<f64, AppError> {
        let range = period.range();
        sqlx::query_scalar::<_, f64>(
            "SELECT CAST(COALESCE(SUM(cash_amount + upi_amount), 0) AS REAL) FROM cash_flow WHERE date BETWEEN ? AND ?",
        )
        .bind(&range.start)
        .bind(&range.end)
        .fetch_one(self.db.pool())
        .await
        .map_err(db_error("sum monthly sales"))
    }
}
