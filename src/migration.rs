//! Schema generation: create (or drop and create) one table per entity.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::settings::SchemaGeneration;
use crate::sql::{create_schema, create_table, drop_table};
use sqlx::PgPool;
use std::collections::HashSet;

/// Apply schema generation for every entity. `SchemaGeneration::None` leaves the database untouched.
pub async fn apply_migrations(
    pool: &PgPool,
    entities: &[ResolvedEntity],
    generation: SchemaGeneration,
) -> Result<(), AppError> {
    let statements = migration_statements(entities, generation);
    if statements.is_empty() {
        return Ok(());
    }
    let mut tx = pool.begin().await?;
    for sql in &statements {
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(tables = entities.len(), ?generation, "schema generation applied");
    Ok(())
}

/// DDL statements in execution order: schemas, drops, then creates.
pub fn migration_statements(entities: &[ResolvedEntity], generation: SchemaGeneration) -> Vec<String> {
    if generation == SchemaGeneration::None {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut schemas = HashSet::new();
    for e in entities {
        if schemas.insert(e.schema_name.as_str()) {
            out.push(create_schema(e));
        }
    }
    if generation == SchemaGeneration::DropAndCreate {
        out.extend(entities.iter().map(drop_table));
    }
    let if_not_exists = generation == SchemaGeneration::Create;
    out.extend(entities.iter().map(|e| create_table(e, if_not_exists)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, EntityConfig, FieldConfig, FieldType, FullConfig};

    fn entities() -> Vec<ResolvedEntity> {
        let config = FullConfig {
            entities: vec![EntityConfig {
                id: "member".into(),
                name: "Member".into(),
                schema: None,
                table: None,
                id_field: Default::default(),
                fields: vec![FieldConfig::new("name", FieldType::String)],
            }],
            resources: vec![],
        };
        resolve(&config).unwrap().entities
    }

    #[test]
    fn none_emits_nothing() {
        assert!(migration_statements(&entities(), SchemaGeneration::None).is_empty());
    }

    #[test]
    fn drop_and_create_order() {
        let stmts = migration_statements(&entities(), SchemaGeneration::DropAndCreate);
        assert_eq!(stmts.len(), 3);
        assert!(stmts[0].starts_with("CREATE SCHEMA IF NOT EXISTS"));
        assert!(stmts[1].starts_with("DROP TABLE IF EXISTS"));
        assert!(stmts[2].starts_with(r#"CREATE TABLE "public"."member""#));
    }

    #[test]
    fn create_keeps_existing_tables() {
        let stmts = migration_statements(&entities(), SchemaGeneration::Create);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[1].starts_with("CREATE TABLE IF NOT EXISTS"));
    }
}
