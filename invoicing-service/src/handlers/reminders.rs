use crate::services::ReminderReport;
use crate::AppState;
use axum::{extract::State, Json};
use chrono::Local;
use service_core::error::AppError;

/// Run the reminder pass now instead of waiting for the daily schedule.
#[tracing::instrument(skip(state))]
pub async fn run_reminders(
    State(state): State<AppState>,
) -> Result<Json<ReminderReport>, AppError> {
    let report = state.notifier.run(Local::now().date_naive()).await?;
    Ok(Json(report))
}
