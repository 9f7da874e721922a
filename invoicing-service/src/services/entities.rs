//! Contact (entity) store operations.

use crate::models::{Entity, EntityRemoval, EntityType, NewEntity};
use crate::services::database::{db_error, Database};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use sqlx::{QueryBuilder, Sqlite};
use tracing::{info, instrument};

const ENTITY_COLUMNS: &str = "SELECT id, name, type, is_active, created_at FROM entities";

#[derive(Clone)]
pub struct EntityService {
    db: Database,
}

impl EntityService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Active contacts sorted by name, optionally of exactly one type.
    #[instrument(skip(self))]
    pub async fn list(&self, entity_type: Option<EntityType>) -> Result<Vec<Entity>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(ENTITY_COLUMNS);
        query.push(" WHERE is_active = 1");
        if let Some(entity_type) = entity_type {
            query.push(" AND type = ").push_bind(entity_type);
        }
        query.push(" ORDER BY name ASC");

        query
            .build_query_as::<Entity>()
            .fetch_all(self.db.pool())
            .await
            .map_err(db_error("list entities"))
    }

    /// Active contacts usable in the company role.
    pub async fn companies(&self) -> Result<Vec<Entity>, AppError> {
        self.list_in_role(EntityType::Company).await
    }

    /// Active contacts usable in the distributor role.
    pub async fn distributors(&self) -> Result<Vec<Entity>, AppError> {
        self.list_in_role(EntityType::Distributor).await
    }

    async fn list_in_role(&self, role: EntityType) -> Result<Vec<Entity>, AppError> {
        sqlx::query_as::<_, Entity>(&format!(
            "{ENTITY_COLUMNS} WHERE is_active = 1 AND (type = ? OR type = 'both') ORDER BY name ASC"
        ))
        .bind(role)
        .fetch_all(self.db.pool())
        .await
        .map_err(db_error("list entities by role"))
    }

    /// Any contact by id, including deactivated ones.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<Entity>, AppError> {
        sqlx::query_as::<_, Entity>(&format!("{ENTITY_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(db_error("get entity"))
    }

    #[instrument(skip(self, input), fields(name = %input.name, entity_type = %input.entity_type))]
    pub async fn create(&self, input: &NewEntity) -> Result<Entity, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_entity"])
            .start_timer();

        let entity = sqlx::query_as::<_, Entity>(
            r#"
            INSERT INTO entities (name, type)
            VALUES (?, ?)
            RETURNING id, name, type, is_active, created_at
            "#,
        )
        .bind(&input.name)
        .bind(input.entity_type)
        .fetch_one(self.db.pool())
        .await
        .map_err(|e| unique_name_conflict(e, &input.name, "create entity"))?;

        timer.observe_duration();
        info!(entity_id = entity.id, "Entity created");
        Ok(entity)
    }

    #[instrument(skip(self, input), fields(name = %input.name, entity_type = %input.entity_type))]
    pub async fn update(&self, id: i64, input: &NewEntity) -> Result<Entity, AppError> {
        let entity = sqlx::query_as::<_, Entity>(
            r#"
            UPDATE entities
            SET name = ?, type = ?
            WHERE id = ?
            RETURNING id, name, type, is_active, created_at
            "#,
        )
        .bind(&input.name)
        .bind(input.entity_type)
        .bind(id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| unique_name_conflict(e, &input.name, "update entity"))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Entity not found")))?;

        info!(entity_id = entity.id, "Entity updated");
        Ok(entity)
    }

    /// Hard-delete an unreferenced contact, or deactivate one that invoices still point at.
    /// The reference check and the write share one transaction.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<EntityRemoval, AppError> {
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(db_error("begin entity delete"))?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM entities WHERE id = ?)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("look up entity"))?;
        if !exists {
            return Err(AppError::NotFound(anyhow::anyhow!("Entity not found")));
        }

        let references: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM invoices WHERE company_id = ? OR distributor_id = ?",
        )
        .bind(id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("count entity references"))?;

        let removal = if references > 0 {
            sqlx::query("UPDATE entities SET is_active = 0 WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("deactivate entity"))?;
            EntityRemoval::Deactivated
        } else {
            sqlx::query("DELETE FROM entities WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("delete entity"))?;
            EntityRemoval::Deleted
        };

        tx.commit().await.map_err(db_error("commit entity delete"))?;

        info!(entity_id = id, references = references, removal = ?removal, "Entity removed");
        Ok(removal)
    }
}

fn unique_name_conflict(e: sqlx::Error, name: &str, operation: &'static str) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => AppError::Conflict(
            anyhow::anyhow!("Entity with name '{}' already exists", name),
        ),
        other => db_error(operation)(other),
    }
}
