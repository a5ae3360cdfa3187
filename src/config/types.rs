//! Raw config types matching the JSON model files (entities.json + resources.json).

use serde::{Deserialize, Serialize};

/// How an entity's identity is assigned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// 64-bit integer from a per-table sequence (BIGSERIAL).
    #[default]
    Sequence,
    /// Random v4 UUID.
    Uuid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Date,
    Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdFieldConfig {
    #[serde(default = "default_id_name")]
    pub name: String,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub strategy: IdStrategy,
}

impl Default for IdFieldConfig {
    fn default() -> Self {
        IdFieldConfig {
            name: default_id_name(),
            column: None,
            strategy: IdStrategy::default(),
        }
    }
}

fn default_id_name() -> String {
    "id".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: FieldType,
    /// Column name; defaults to snake_case of `name`.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>, type_: FieldType) -> Self {
        FieldConfig {
            name: name.into(),
            type_,
            column: None,
            nullable: true,
            max_length: None,
            min_length: None,
            pattern: None,
            format: None,
        }
    }
}

fn default_true() -> bool {
    true
}

pub const DEFAULT_SCHEMA: &str = "public";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub id: String,
    /// Entity name, e.g. "Member". Used for the table name and OpenAPI schema.
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub id_field: IdFieldConfig,
    pub fields: Vec<FieldConfig>,
}

impl EntityConfig {
    pub fn schema_name(&self) -> String {
        self.schema.clone().unwrap_or_else(|| DEFAULT_SCHEMA.into())
    }

    /// Explicit table name, or snake_case of the entity name.
    pub fn table_name(&self) -> String {
        self.table.clone().unwrap_or_else(|| crate::case::to_snake_case(&self.name))
    }
}

/// Per-operation switches. `exposed = false` keeps the route but makes it fail.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MethodProperties {
    #[serde(default = "default_true")]
    pub exposed: bool,
}

impl Default for MethodProperties {
    fn default() -> Self {
        MethodProperties { exposed: true }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MethodsConfig {
    #[serde(default)]
    pub create: MethodProperties,
    #[serde(default)]
    pub list: MethodProperties,
    #[serde(default)]
    pub get: MethodProperties,
    #[serde(default)]
    pub update: MethodProperties,
    #[serde(default)]
    pub delete: MethodProperties,
}

/// Declares that an entity is exposed over HTTP. One entry produces the five CRUD routes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource name, e.g. "MemberResource". The URL path is derived from it unless `path` is set.
    pub name: String,
    pub entity_id: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub hal: bool,
    #[serde(default)]
    pub hal_collection_name: Option<String>,
    #[serde(default)]
    pub paged: bool,
    #[serde(default)]
    pub methods: MethodsConfig,
}

impl ResourceConfig {
    pub fn new(name: impl Into<String>, entity_id: impl Into<String>) -> Self {
        ResourceConfig {
            name: name.into(),
            entity_id: entity_id.into(),
            path: None,
            hal: false,
            hal_collection_name: None,
            paged: false,
            methods: MethodsConfig::default(),
        }
    }
}

/// All model config in one struct for in-memory loading.
#[derive(Clone, Debug, Default)]
pub struct FullConfig {
    pub entities: Vec<EntityConfig>,
    pub resources: Vec<ResourceConfig>,
}
