//! Config validation: referential integrity and path consistency.

use crate::case::{resource_path, to_snake_case};
use crate::config::{EntityConfig, FullConfig, ResourceConfig};
use crate::error::ConfigError;
use std::collections::HashSet;

/// Paths served by the common routes; a resource mounted there would collide when no root path is set.
const RESERVED_PATHS: &[&str] = &["health", "ready", "version", "openapi.json"];

/// Final URL path of a resource: the override when present, otherwise derived from its name.
pub fn effective_path(resource: &ResourceConfig) -> String {
    match &resource.path {
        Some(p) => p.trim_matches('/').to_string(),
        None => resource_path(&resource.name),
    }
}

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    let mut entity_ids = HashSet::new();
    let mut tables = HashSet::new();
    for e in &config.entities {
        if !entity_ids.insert(e.id.as_str()) {
            return Err(ConfigError::Duplicate {
                kind: "entity id",
                name: e.id.clone(),
            });
        }
        let table = format!("{}.{}", e.schema_name(), e.table_name());
        if !tables.insert(table.to_lowercase()) {
            return Err(ConfigError::Duplicate { kind: "table", name: table });
        }
        validate_entity(e)?;
    }

    let mut paths = HashSet::new();
    for r in &config.resources {
        if !entity_ids.contains(r.entity_id.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "entity",
                id: r.entity_id.clone(),
            });
        }
        let path = effective_path(r);
        validate_path(&r.name, &path)?;
        if !paths.insert(path.clone()) {
            return Err(ConfigError::DuplicatePath(path));
        }
    }

    Ok(())
}

fn validate_entity(e: &EntityConfig) -> Result<(), ConfigError> {
    if e.fields.is_empty() {
        return Err(ConfigError::Validation(format!("entity {} has no fields", e.id)));
    }
    let id_column = e
        .id_field
        .column
        .clone()
        .unwrap_or_else(|| to_snake_case(&e.id_field.name));
    let mut names: HashSet<&str> = HashSet::new();
    let mut columns: HashSet<String> = HashSet::new();
    names.insert(e.id_field.name.as_str());
    columns.insert(id_column);
    for f in &e.fields {
        if !names.insert(f.name.as_str()) {
            return Err(ConfigError::Duplicate {
                kind: "field",
                name: format!("{}.{}", e.id, f.name),
            });
        }
        let column = f.column.clone().unwrap_or_else(|| to_snake_case(&f.name));
        if !columns.insert(column.clone()) {
            return Err(ConfigError::Duplicate {
                kind: "column",
                name: format!("{}.{}", e.id, column),
            });
        }
        if let Some(pattern) = &f.pattern {
            regex::Regex::new(pattern).map_err(|err| {
                ConfigError::Validation(format!("invalid pattern for {}.{}: {}", e.id, f.name, err))
            })?;
        }
        if let (Some(min), Some(max)) = (f.min_length, f.max_length) {
            if min > max {
                return Err(ConfigError::Validation(format!(
                    "{}.{}: min_length {} exceeds max_length {}",
                    e.id, f.name, min, max
                )));
            }
        }
    }
    Ok(())
}

fn validate_path(resource: &str, path: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidPath {
        resource: resource.to_string(),
        path: path.to_string(),
    };
    if path.is_empty() || RESERVED_PATHS.contains(&path) {
        return Err(invalid());
    }
    for segment in path.split('/') {
        if segment.is_empty() || segment.starts_with(':') || segment.starts_with('*') || segment.contains('{') {
            return Err(invalid());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldConfig, FieldType};

    fn member() -> EntityConfig {
        EntityConfig {
            id: "member".into(),
            name: "Member".into(),
            schema: None,
            table: None,
            id_field: Default::default(),
            fields: vec![
                FieldConfig::new("name", FieldType::String),
                FieldConfig::new("email", FieldType::String),
            ],
        }
    }

    #[test]
    fn accepts_sample_shape() {
        let config = FullConfig {
            entities: vec![member()],
            resources: vec![ResourceConfig::new("MemberResource", "member")],
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn rejects_unknown_entity() {
        let config = FullConfig {
            entities: vec![member()],
            resources: vec![ResourceConfig::new("PeopleResource", "people")],
        };
        assert!(matches!(
            validate(&config),
            Err(ConfigError::MissingReference { kind: "entity", .. })
        ));
    }

    #[test]
    fn rejects_duplicate_paths_after_derivation() {
        let mut other = ResourceConfig::new("Members", "member");
        other.path = Some("/member/".into());
        let config = FullConfig {
            entities: vec![member()],
            resources: vec![ResourceConfig::new("MemberResource", "member"), other],
        };
        assert!(matches!(validate(&config), Err(ConfigError::DuplicatePath(p)) if p == "member"));
    }

    #[test]
    fn rejects_field_colliding_with_identity() {
        let mut e = member();
        e.fields.push(FieldConfig::new("id", FieldType::Integer));
        let config = FullConfig {
            entities: vec![e],
            resources: vec![],
        };
        assert!(matches!(validate(&config), Err(ConfigError::Duplicate { kind: "field", .. })));
    }

    #[test]
    fn rejects_paths_of_common_routes() {
        let mut overridden = ResourceConfig::new("MemberResource", "member");
        overridden.path = Some("/openapi.json".into());
        for r in [ResourceConfig::new("HealthResource", "member"), overridden] {
            let config = FullConfig {
                entities: vec![member()],
                resources: vec![r],
            };
            assert!(matches!(validate(&config), Err(ConfigError::InvalidPath { .. })));
        }

        let mut nested = ResourceConfig::new("MemberResource", "member");
        nested.path = Some("health/members".into());
        let config = FullConfig {
            entities: vec![member()],
            resources: vec![nested],
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn rejects_entities_sharing_a_table() {
        let mut same_name = member();
        same_name.id = "member2".into();
        let config = FullConfig {
            entities: vec![member(), same_name],
            resources: vec![],
        };
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Duplicate { kind: "table", name }) if name == "public.member"
        ));

        let mut explicit = member();
        explicit.id = "people".into();
        explicit.name = "Person".into();
        explicit.table = Some("MEMBER".into());
        let config = FullConfig {
            entities: vec![member(), explicit],
            resources: vec![],
        };
        assert!(matches!(validate(&config), Err(ConfigError::Duplicate { kind: "table", .. })));

        let mut other_schema = member();
        other_schema.id = "archive".into();
        other_schema.schema = Some("archive".into());
        let config = FullConfig {
            entities: vec![member(), other_schema],
            resources: vec![],
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn rejects_parameter_syntax_in_path() {
        let mut r = ResourceConfig::new("MemberResource", "member");
        r.path = Some("members/:id".into());
        let config = FullConfig {
            entities: vec![member()],
            resources: vec![r],
        };
        assert!(matches!(validate(&config), Err(ConfigError::InvalidPath { .. })));
    }
}
