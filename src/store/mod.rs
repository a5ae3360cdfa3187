//! Storage backends for entity records.
//!
//! Records cross this boundary keyed by column name. Attribute values are
//! already validated and normalized by the service layer; stores only move
//! them in and out.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::config::{IdStrategy, ResolvedEntity};
use crate::error::AppError;
use crate::settings::SchemaGeneration;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// One row, keyed by column name.
pub type Record = serde_json::Map<String, Value>;

/// Identity of a stored record. Ordering matches PostgreSQL ordering of the column type.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityId {
    Int(i64),
    Uuid(uuid::Uuid),
}

impl EntityId {
    /// Parse an identity taken from a URL path.
    pub fn parse(raw: &str, strategy: IdStrategy) -> Result<Self, AppError> {
        match strategy {
            IdStrategy::Sequence => raw
                .parse::<i64>()
                .map(EntityId::Int)
                .map_err(|_| AppError::BadRequest(format!("invalid id: {}", raw))),
            IdStrategy::Uuid => uuid::Uuid::parse_str(raw)
                .map(EntityId::Uuid)
                .map_err(|_| AppError::BadRequest(format!("invalid uuid: {}", raw))),
        }
    }

    /// Read an identity from a JSON value (seed rows, stored records).
    pub fn from_json(value: &Value, strategy: IdStrategy) -> Result<Self, AppError> {
        match (strategy, value) {
            (IdStrategy::Sequence, Value::Number(n)) => n
                .as_i64()
                .map(EntityId::Int)
                .ok_or_else(|| AppError::BadRequest(format!("invalid id: {}", n))),
            (_, Value::String(s)) => Self::parse(s, strategy),
            (_, other) => Err(AppError::BadRequest(format!("invalid id: {}", other))),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            EntityId::Int(n) => Value::Number((*n).into()),
            EntityId::Uuid(u) => Value::String(u.to_string()),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(n) => write!(f, "{}", n),
            EntityId::Uuid(u) => write!(f, "{}", u),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub index: u32,
    pub size: u32,
}

impl Page {
    pub fn offset(&self) -> u64 {
        self.index as u64 * self.size as u64
    }
}

/// List ordering and window. Identity ascending is always the final sort key.
#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub sort: Vec<SortKey>,
    pub page: Option<Page>,
}

/// Result of an update-or-create.
#[derive(Clone, Debug)]
pub enum Upserted {
    Created(Record),
    Replaced(Record),
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Liveness check behind `/ready`.
    async fn ping(&self) -> Result<(), AppError>;

    /// Create (or drop and create) storage for every entity.
    async fn prepare(&self, entities: &[ResolvedEntity], generation: SchemaGeneration) -> Result<(), AppError>;

    async fn list(&self, entity: &ResolvedEntity, query: &ListQuery) -> Result<Vec<Record>, AppError>;

    async fn count(&self, entity: &ResolvedEntity) -> Result<u64, AppError>;

    async fn get(&self, entity: &ResolvedEntity, id: &EntityId) -> Result<Option<Record>, AppError>;

    /// Insert with an assigned identity. `record` holds every attribute column.
    async fn insert(&self, entity: &ResolvedEntity, record: &Record) -> Result<Record, AppError>;

    /// Replace the record with this identity, or create it with exactly this identity.
    /// Explicit identities advance the sequence so assigned identities never collide.
    async fn upsert(&self, entity: &ResolvedEntity, id: &EntityId, record: &Record) -> Result<Upserted, AppError>;

    /// Returns false when no record had this identity.
    async fn delete(&self, entity: &ResolvedEntity, id: &EntityId) -> Result<bool, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_ids() {
        assert_eq!(EntityId::parse("42", IdStrategy::Sequence).unwrap(), EntityId::Int(42));
        assert!(EntityId::parse("abc", IdStrategy::Sequence).is_err());
        let u = uuid::Uuid::new_v4();
        assert_eq!(
            EntityId::parse(&u.to_string(), IdStrategy::Uuid).unwrap(),
            EntityId::Uuid(u)
        );
        assert!(EntityId::parse("42", IdStrategy::Uuid).is_err());
    }

    #[test]
    fn reads_json_ids() {
        assert_eq!(
            EntityId::from_json(&serde_json::json!(7), IdStrategy::Sequence).unwrap(),
            EntityId::Int(7)
        );
        assert_eq!(
            EntityId::from_json(&serde_json::json!("7"), IdStrategy::Sequence).unwrap(),
            EntityId::Int(7)
        );
        assert!(EntityId::from_json(&serde_json::json!(1.5), IdStrategy::Sequence).is_err());
    }

    #[test]
    fn page_offset() {
        assert_eq!(Page { index: 3, size: 20 }.offset(), 60);
    }
}
