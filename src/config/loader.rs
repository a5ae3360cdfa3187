//! Load model config from a directory of JSON files and resolve it for runtime use.

use crate::case::to_snake_case;
use crate::config::resolved::{ColumnInfo, IdColumn, Operation, ResolvedEntity, ResolvedModel, ResolvedResource};
use crate::config::types::*;
use crate::config::{effective_path, validate, FullConfig};
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

/// Build resolved model from full config (validates first).
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let mut entities_by_id: HashMap<&str, ResolvedEntity> = HashMap::new();
    let mut entities = Vec::with_capacity(config.entities.len());
    for e in &config.entities {
        let entity = resolve_entity(e)?;
        entities_by_id.insert(e.id.as_str(), entity.clone());
        entities.push(entity);
    }

    let mut resources = Vec::with_capacity(config.resources.len());
    for r in &config.resources {
        let entity = entities_by_id
            .get(r.entity_id.as_str())
            .cloned()
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "entity",
                id: r.entity_id.clone(),
            })?;
        let path = effective_path(r);
        let hal_collection_name = r
            .hal_collection_name
            .clone()
            .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(&path).to_string());
        let exposed: HashMap<Operation, bool> = [
            (Operation::Create, r.methods.create.exposed),
            (Operation::List, r.methods.list.exposed),
            (Operation::Get, r.methods.get.exposed),
            (Operation::Update, r.methods.update.exposed),
            (Operation::Delete, r.methods.delete.exposed),
        ]
        .into_iter()
        .collect();
        tracing::debug!(resource = %r.name, path = %path, entity = %r.entity_id, "resolved resource");
        resources.push(ResolvedResource::new(
            r.name.clone(),
            path,
            entity,
            r.hal,
            hal_collection_name,
            r.paged,
            exposed,
        ));
    }

    Ok(ResolvedModel { resources, entities })
}

fn resolve_entity(e: &EntityConfig) -> Result<ResolvedEntity, ConfigError> {
    let columns = e
        .fields
        .iter()
        .map(|f| {
            let pattern = f
                .pattern
                .as_deref()
                .map(regex::Regex::new)
                .transpose()
                .map_err(|err| ConfigError::Validation(format!("invalid pattern for {}.{}: {}", e.id, f.name, err)))?;
            Ok(ColumnInfo {
                field: f.name.clone(),
                column: f.column.clone().unwrap_or_else(|| to_snake_case(&f.name)),
                type_: f.type_,
                nullable: f.nullable,
                max_length: f.max_length,
                min_length: f.min_length,
                pattern,
                format: f.format.clone(),
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    Ok(ResolvedEntity {
        entity_id: e.id.clone(),
        name: e.name.clone(),
        schema_name: e.schema_name(),
        table_name: e.table_name(),
        id: IdColumn {
            field: e.id_field.name.clone(),
            column: e
                .id_field
                .column
                .clone()
                .unwrap_or_else(|| to_snake_case(&e.id_field.name)),
            strategy: e.id_field.strategy,
        },
        columns,
    })
}

/// Load `entities.json` and `resources.json` from a model directory.
/// A missing `resources.json` means no entity is exposed.
pub async fn load_from_dir(dir: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let dir = dir.as_ref();
    let entities = read_json_file(&dir.join("entities.json"), false).await?;
    let resources = read_json_file(&dir.join("resources.json"), true).await?;
    tracing::info!(
        dir = %dir.display(),
        entities = entities.len(),
        resources = resources.len(),
        "loaded model config"
    );
    Ok(FullConfig { entities, resources })
}

async fn read_json_file<T>(path: &Path, optional: bool) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let text = match tokio::fs::read_to_string(path).await {
        Ok(t) => t,
        Err(e) if optional && e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ConfigError::Load(format!("{}: {}", path.display(), e))),
    };
    serde_json::from_str(&text).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}
