//! Contact entity model: a company, a distributor, or both.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Role a contact plays on invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EntityType {
    Company,
    Distributor,
    Both,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Company => "company",
            EntityType::Distributor => "distributor",
            EntityType::Both => "both",
        }
    }

    /// Strict parse; unknown values are rejected rather than defaulted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "company" => Some(EntityType::Company),
            "distributor" => Some(EntityType::Distributor),
            "both" => Some(EntityType::Both),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized contact row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Entity {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub entity_type: EntityType,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// Input for creating or updating a contact.
#[derive(Debug, Clone)]
pub struct NewEntity {
    pub name: String,
    pub entity_type: EntityType,
}

/// What a delete request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRemoval {
    /// Still referenced by invoices, so only marked inactive.
    Deactivated,
    Deleted,
}
