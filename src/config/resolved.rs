//! Resolved model: config validated and flattened for runtime use.

use crate::config::{FieldType, IdStrategy};
use std::collections::HashMap;
use std::fmt;

/// The five generated operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    List,
    Get,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Create,
        Operation::List,
        Operation::Get,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct IdColumn {
    /// JSON field name.
    pub field: String,
    pub column: String,
    pub strategy: IdStrategy,
}

impl IdColumn {
    /// PostgreSQL type name used for casts and DDL.
    pub fn pg_type(&self) -> &'static str {
        match self.strategy {
            IdStrategy::Sequence => "bigint",
            IdStrategy::Uuid => "uuid",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    /// JSON field name.
    pub field: String,
    pub column: String,
    pub type_: FieldType,
    pub nullable: bool,
    pub max_length: Option<u32>,
    pub min_length: Option<u32>,
    pub pattern: Option<regex::Regex>,
    pub format: Option<String>,
}

impl ColumnInfo {
    /// PostgreSQL type name for SQL casts when binding values.
    pub fn pg_type(&self) -> &'static str {
        match self.type_ {
            FieldType::String => "varchar",
            FieldType::Integer => "bigint",
            FieldType::Number => "double precision",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Timestamp => "timestamptz",
        }
    }

    /// Column type for CREATE TABLE.
    pub fn ddl_type(&self) -> String {
        match self.type_ {
            FieldType::String => format!("VARCHAR({})", self.max_length.unwrap_or(255)),
            FieldType::Integer => "BIGINT".into(),
            FieldType::Number => "DOUBLE PRECISION".into(),
            FieldType::Boolean => "BOOLEAN".into(),
            FieldType::Date => "DATE".into(),
            FieldType::Timestamp => "TIMESTAMPTZ".into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub entity_id: String,
    pub name: String,
    pub schema_name: String,
    pub table_name: String,
    pub id: IdColumn,
    pub columns: Vec<ColumnInfo>,
}

impl ResolvedEntity {
    pub fn column_by_field(&self, field: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.field == field)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedResource {
    pub name: String,
    /// URL path relative to the root, without leading or trailing '/'. May contain several segments.
    pub path: String,
    pub entity: ResolvedEntity,
    pub hal: bool,
    pub hal_collection_name: String,
    pub paged: bool,
    exposed: HashMap<Operation, bool>,
}

impl ResolvedResource {
    pub(crate) fn new(
        name: String,
        path: String,
        entity: ResolvedEntity,
        hal: bool,
        hal_collection_name: String,
        paged: bool,
        exposed: HashMap<Operation, bool>,
    ) -> Self {
        ResolvedResource {
            name,
            path,
            entity,
            hal,
            hal_collection_name,
            paged,
            exposed,
        }
    }

    pub fn is_exposed(&self, op: Operation) -> bool {
        self.exposed.get(&op).copied().unwrap_or(true)
    }

    pub fn exposed_operations(&self) -> impl Iterator<Item = Operation> + '_ {
        Operation::ALL.into_iter().filter(|op| self.is_exposed(*op))
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub resources: Vec<ResolvedResource>,
    pub entities: Vec<ResolvedEntity>,
}

impl ResolvedModel {
    pub fn resource_by_path(&self, path: &str) -> Option<&ResolvedResource> {
        let path = path.trim_matches('/');
        self.resources.iter().find(|r| r.path == path)
    }

    /// Look up an entity by table name (case-insensitive, optionally schema-qualified).
    pub fn entity_by_table(&self, table: &str) -> Option<&ResolvedEntity> {
        let (schema, table) = match table.rsplit_once('.') {
            Some((s, t)) => (Some(s), t),
            None => (None, table),
        };
        self.entities.iter().find(|e| {
            e.table_name.eq_ignore_ascii_case(table)
                && schema.map(|s| e.schema_name.eq_ignore_ascii_case(s)).unwrap_or(true)
        })
    }
}
