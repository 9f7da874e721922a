use super::validate_non_blank;
use crate::models::{Entity, EntityRemoval, EntityType, NewEntity};
use crate::services::{EntityMigration, MigrationReport};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, Validate)]
pub struct EntityRequest {
    #[validate(custom(function = "validate_non_blank"))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(custom(function = "validate_entity_type"))]
    pub entity_type: String,
}

impl EntityRequest {
    fn into_new_entity(self) -> Result<NewEntity, AppError> {
        self.validate()?;
        let entity_type = EntityType::parse(&self.entity_type).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Invalid entity type '{}'", self.entity_type))
        })?;
        Ok(NewEntity {
            name: self.name.trim().to_string(),
            entity_type,
        })
    }
}

fn validate_entity_type(value: &str) -> Result<(), ValidationError> {
    if EntityType::parse(value).is_some() {
        return Ok(());
    }
    let mut err = ValidationError::new("entity_type");
    err.message = Some("Invalid type. Must be company, distributor, or both".into());
    Err(err)
}

#[derive(Debug, Deserialize)]
pub struct ListEntitiesQuery {
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteEntityResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl From<EntityRemoval> for DeleteEntityResponse {
    fn from(removal: EntityRemoval) -> Self {
        match removal {
            EntityRemoval::Deactivated => Self {
                message: "Entity deactivated (has existing invoices)".to_string(),
                deactivated: Some(true),
                deleted: None,
            },
            EntityRemoval::Deleted => Self {
                message: "Entity deleted".to_string(),
                deactivated: None,
                deleted: Some(true),
            },
        }
    }
}

pub async fn list_entities(
    State(state): State<AppState>,
    Query(query): Query<ListEntitiesQuery>,
) -> Result<Json<Vec<Entity>>, AppError> {
    let entity_type = match query.entity_type.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(EntityType::parse(raw).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Invalid type '{}'. Must be company, distributor, or both",
                raw
            ))
        })?),
    };
    Ok(Json(state.entities.list(entity_type).await?))
}

pub async fn list_companies(State(state): State<AppState>) -> Result<Json<Vec<Entity>>, AppError> {
    Ok(Json(state.entities.companies().await?))
}

pub async fn list_distributors(
    State(state): State<AppState>,
) -> Result<Json<Vec<Entity>>, AppError> {
    Ok(Json(state.entities.distributors().await?))
}

pub async fn get_entity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Entity>, AppError> {
    state
        .entities
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Entity not found")))
}

#[tracing::instrument(skip(state, request))]
pub async fn create_entity(
    State(state): State<AppState>,
    Json(request): Json<EntityRequest>,
) -> Result<(StatusCode, Json<Entity>), AppError> {
    let input = request.into_new_entity()?;
    let entity = state.entities.create(&input).await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_entity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<EntityRequest>,
) -> Result<Json<Entity>, AppError> {
    let input = request.into_new_entity()?;
    Ok(Json(state.entities.update(id, &input).await?))
}

#[tracing::instrument(skip(state))]
pub async fn delete_entity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteEntityResponse>, AppError> {
    let removal = state.entities.delete(id).await?;
    Ok(Json(removal.into()))
}

/// Re-run the legacy contact backfill.
pub async fn migrate_entities(
    State(state): State<AppState>,
) -> Result<Json<MigrationReport>, AppError> {
    Ok(Json(EntityMigration::run(&state.db).await?))
}
