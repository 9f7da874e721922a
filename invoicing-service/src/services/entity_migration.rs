//! Backfill of normalized contacts from the legacy free-text invoice columns.
//!
//! Each distinct `(company, distributor)` pair among unlinked invoices becomes one or two
//! entities and the matching invoices are pointed at them. Linked invoices are never
//! revisited, so running the backfill again is a no-op.

use crate::models::EntityType;
use crate::services::database::{db_error, Database};
use crate::services::metrics::ENTITY_MIGRATION_TOTAL;
use serde::Serialize;
use service_core::error::AppError;
use sqlx::{Sqlite, Transaction};
use tracing::{info, instrument, warn};

/// Outcome of one backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// False when no invoice needed linking.
    pub triggered: bool,
    pub pairs_processed: u64,
    pub pairs_failed: u64,
    pub invoices_linked: u64,
    pub entities_created: u64,
}

#[derive(Debug, Default)]
struct PairOutcome {
    invoices_linked: u64,
    entities_created: u64,
}

pub struct EntityMigration;

impl EntityMigration {
    #[instrument(skip(db))]
    pub async fn run(db: &Database) -> Result<MigrationReport, AppError> {
        let mut report = MigrationReport::default();

        let pending: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM invoices WHERE company IS NOT NULL AND company <> '' AND company_id IS NULL",
        )
        .fetch_one(db.pool())
        .await
        .map_err(db_error("count unlinked invoices"))?;

        if pending == 0 {
            return Ok(report);
        }
        report.triggered = true;
        info!(unlinked_invoices = pending, "Linking legacy invoices to entities");

        let pairs: Vec<(String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT DISTINCT company, distributor FROM invoices
            WHERE company IS NOT NULL AND company <> '' AND company_id IS NULL
            "#,
        )
        .fetch_all(db.pool())
        .await
        .map_err(db_error("list legacy contact pairs"))?;

        for (company, distributor) in pairs {
            match migrate_pair(db, &company, distributor.as_deref()).await {
                Ok(outcome) => {
                    report.pairs_processed += 1;
                    report.invoices_linked += outcome.invoices_linked;
                    report.entities_created += outcome.entities_created;
                    ENTITY_MIGRATION_TOTAL.with_label_values(&["migrated"]).inc();
                }
                Err(e) => {
                    report.pairs_failed += 1;
                    ENTITY_MIGRATION_TOTAL.with_label_values(&["failed"]).inc();
                    warn!(
                        company = %company,
                        distributor = ?distributor,
                        error = %e,
                        "Skipping contact pair"
                    );
                }
            }
        }

        info!(
            pairs_processed = report.pairs_processed,
            pairs_failed = report.pairs_failed,
            invoices_linked = report.invoices_linked,
            entities_created = report.entities_created,
            "Entity backfill finished"
        );
        Ok(report)
    }
}

async fn migrate_pair(
    db: &Database,
    company: &str,
    distributor: Option<&str>,
) -> Result<PairOutcome, AppError> {
    let mut outcome = PairOutcome::default();
    let mut tx = db
        .pool()
        .begin()
        .await
        .map_err(db_error("begin backfill transaction"))?;

    let (company_id, created) = ensure_entity(&mut tx, company, EntityType::Company).await?;
    outcome.entities_created += created;

    let distributor_id = match distributor.filter(|d| !d.is_empty()) {
        Some(name) if name == company => {
            sqlx::query("UPDATE entities SET type = 'both' WHERE id = ?")
                .bind(company_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error("upgrade entity type"))?;
            Some(company_id)
        }
        Some(name) => {
            let (id, created) = ensure_entity(&mut tx, name, EntityType::Distributor).await?;
            outcome.entities_created += created;
            Some(id)
        }
        None => None,
    };

    // `IS` so that a NULL distributor matches NULL.
    outcome.invoices_linked = sqlx::query(
        r#"
        UPDATE invoices SET company_id = ?, distributor_id = ?
        WHERE company = ? AND distributor IS ? AND company_id IS NULL
        "#,
    )
    .bind(company_id)
    .bind(distributor_id)
    .bind(company)
    .bind(distributor)
    .execute(&mut *tx)
    .await
    .map_err(db_error("link invoices"))?
    .rows_affected();

    tx.commit().await.map_err(db_error("commit backfill pair"))?;
    Ok(outcome)
}

/// Insert-or-ignore by name; returns the id and whether a row was created.
async fn ensure_entity(
    tx: &mut Transaction<'_, Sqlite>,
    name: &str,
    entity_type: EntityType,
) -> Result<(i64, u64), AppError> {
    let created = sqlx::query("INSERT OR IGNORE INTO entities (name, type) VALUES (?, ?)")
        .bind(name)
        .bind(entity_type)
        .execute(&mut **tx)
        .await
        .map_err(db_error("insert entity"))?
        .rows_affected();

    let id: i64 = sqlx::query_scalar("SELECT id FROM entities WHERE name = ?")
        .bind(name)
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error("look up entity id"))?;

    Ok((id, created))
}
