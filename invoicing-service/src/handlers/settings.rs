use super::{validate_non_blank, MessageResponse};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::collections::BTreeMap;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertSettingRequest {
    #[validate(custom(function = "validate_non_blank"))]
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SettingValue {
    pub value: Option<String>,
}

pub async fn list_settings(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, Option<String>>>, AppError> {
    Ok(Json(state.settings.all().await?))
}

pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<SettingValue>, AppError> {
    let value = state.settings.get(&key).await?;
    Ok(Json(SettingValue { value }))
}

#[tracing::instrument(skip(state, request))]
pub async fn upsert_setting(
    State(state): State<AppState>,
    Json(request): Json<UpsertSettingRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    request.validate()?;
    state
        .settings
        .set(request.key.trim(), request.value.as_deref())
        .await?;
    Ok(Json(MessageResponse::new("Saved")))
}
