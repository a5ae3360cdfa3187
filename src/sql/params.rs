//! Convert validated JSON values and identities to types that sqlx can bind.

use crate::config::{ColumnInfo, FieldType};
use crate::store::EntityId;
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// A value that can be bound to a PostgreSQL query. Every placeholder carries an explicit cast,
/// so dates and timestamps travel as text and PostgreSQL parses them.
#[derive(Clone, Debug)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Uuid(uuid::Uuid),
}

impl PgBindValue {
    /// Bind value for an attribute column. Missing and null both bind NULL.
    pub fn for_column(v: Option<&Value>, column: &ColumnInfo) -> Self {
        let Some(v) = v else {
            return PgBindValue::Null;
        };
        match (column.type_, v) {
            (_, Value::Null) => PgBindValue::Null,
            (FieldType::Boolean, Value::Bool(b)) => PgBindValue::Bool(*b),
            (FieldType::Integer, Value::Number(n)) => n
                .as_i64()
                .map(PgBindValue::I64)
                .unwrap_or_else(|| PgBindValue::String(n.to_string())),
            (FieldType::Number, Value::Number(n)) => n
                .as_f64()
                .map(PgBindValue::F64)
                .unwrap_or_else(|| PgBindValue::String(n.to_string())),
            (_, Value::String(s)) => PgBindValue::String(s.clone()),
            (_, other) => PgBindValue::String(other.to_string()),
        }
    }

    pub fn from_id(id: &EntityId) -> Self {
        match id {
            EntityId::Int(n) => PgBindValue::I64(*n),
            EntityId::Uuid(u) => PgBindValue::Uuid(*u),
        }
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => <Option<String> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf)?,
            PgBindValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Null | PgBindValue::String(_) => <String as sqlx::Type<Postgres>>::type_info(),
            PgBindValue::Bool(_) => <bool as sqlx::Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as sqlx::Type<Postgres>>::type_info(),
            PgBindValue::F64(_) => <f64 as sqlx::Type<Postgres>>::type_info(),
            PgBindValue::Uuid(_) => <uuid::Uuid as sqlx::Type<Postgres>>::type_info(),
        })
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}
