//! HTTP handlers for invoicing-service.

pub mod cash_flow;
pub mod entities;
pub mod health;
pub mod invoices;
pub mod reminders;
pub mod settings;
pub mod summary;

use crate::models::{parse_iso_date, MonthPeriod};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use service_core::error::AppError;
use validator::ValidationError;

pub use health::{health_check, metrics_endpoint, readiness_check};

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `?month=&year=` shared by the monthly summaries.
#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl MonthQuery {
    pub fn period(&self) -> Result<MonthPeriod, AppError> {
        let (Some(month), Some(year)) = (self.month, self.year) else {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "month and year are required"
            )));
        };
        MonthPeriod::new(month, year).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("month must be between 1 and 12"))
        })
    }
}

pub(crate) fn validate_iso_date(value: &str) -> Result<(), ValidationError> {
    if parse_iso_date(value).is_some() {
        return Ok(());
    }
    let mut err = ValidationError::new("date");
    err.message = Some("Date must be a valid YYYY-MM-DD date".into());
    Err(err)
}

pub(crate) fn validate_non_blank(value: &str) -> Result<(), ValidationError> {
    if !value.trim().is_empty() {
        return Ok(());
    }
    let mut err = ValidationError::new("blank");
    err.message = Some("Value cannot be blank".into());
    Err(err)
}

/// Parse a path or body date that has already been checked, or reject it.
pub(crate) fn iso_date(value: &str) -> Result<NaiveDate, AppError> {
    parse_iso_date(value).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Invalid date '{}', expected YYYY-MM-DD", value))
    })
}

/// Form selects post ids as strings, with `""` meaning none.
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Number(id)) => Ok(Some(id)),
        Some(RawId::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(RawId::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid id '{}'", text))),
    }
}
