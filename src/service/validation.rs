//! Request validation from entity field definitions.

use crate::config::{ColumnInfo, FieldType, ResolvedEntity};
use crate::error::AppError;
use crate::store::Record;
use serde_json::{Map, Value};

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a full record payload and turn it into a column-keyed record.
    ///
    /// Every attribute is present in the result; missing ones become null (full replace).
    /// An identity in the body is ignored; unknown fields are rejected.
    pub fn validate(entity: &ResolvedEntity, body: &Map<String, Value>) -> Result<Record, AppError> {
        for key in body.keys() {
            if *key != entity.id.field && entity.column_by_field(key).is_none() {
                return Err(AppError::BadRequest(format!("unknown field: {}", key)));
            }
        }
        let mut record = Record::new();
        for c in &entity.columns {
            let value = body.get(&c.field).unwrap_or(&Value::Null);
            if value.is_null() {
                if !c.nullable {
                    return Err(AppError::Validation(format!("{} is required", c.field)));
                }
                record.insert(c.column.clone(), Value::Null);
                continue;
            }
            record.insert(c.column.clone(), validate_field(c, value)?);
        }
        Ok(record)
    }
}

/// Check one non-null value and return its normalized form.
fn validate_field(c: &ColumnInfo, v: &Value) -> Result<Value, AppError> {
    let col = c.field.as_str();
    match c.type_ {
        FieldType::String => {
            let s = v
                .as_str()
                .ok_or_else(|| AppError::Validation(format!("{} must be a string", col)))?;
            validate_text(c, s)?;
            Ok(v.clone())
        }
        FieldType::Integer => v
            .as_i64()
            .map(|n| Value::Number(n.into()))
            .ok_or_else(|| AppError::Validation(format!("{} must be an integer", col))),
        FieldType::Number => {
            if v.is_number() {
                Ok(v.clone())
            } else {
                Err(AppError::Validation(format!("{} must be a number", col)))
            }
        }
        FieldType::Boolean => {
            if v.is_boolean() {
                Ok(v.clone())
            } else {
                Err(AppError::Validation(format!("{} must be a boolean", col)))
            }
        }
        FieldType::Date => {
            let d = v
                .as_str()
                .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .ok_or_else(|| AppError::Validation(format!("{} must be a date (YYYY-MM-DD)", col)))?;
            Ok(Value::String(d.format("%Y-%m-%d").to_string()))
        }
        FieldType::Timestamp => {
            let t = v
                .as_str()
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .ok_or_else(|| AppError::Validation(format!("{} must be an RFC 3339 timestamp", col)))?;
            Ok(Value::String(t.with_timezone(&chrono::Utc).to_rfc3339()))
        }
    }
}

fn validate_text(c: &ColumnInfo, s: &str) -> Result<(), AppError> {
    let col = c.field.as_str();
    let len = s.chars().count();
    if let Some(max) = c.max_length {
        if len > max as usize {
            return Err(AppError::Validation(format!(
                "{} must be at most {} characters",
                col, max
            )));
        }
    }
    if let Some(min) = c.min_length {
        if len < min as usize {
            return Err(AppError::Validation(format!(
                "{} must be at least {} characters",
                col, min
            )));
        }
    }
    if let Some(re) = &c.pattern {
        if !re.is_match(s) {
            return Err(AppError::Validation(format!("{} does not match required pattern", col)));
        }
    }
    if let Some(format) = &c.format {
        validate_format(col, s, format)?;
    }
    Ok(())
}

fn validate_format(col: &str, s: &str, format: &str) -> Result<(), AppError> {
    match format.to_lowercase().as_str() {
        "email" => {
            let valid = s
                .split_once('@')
                .map(|(local, domain)| !local.is_empty() && !domain.is_empty() && !domain.contains('@'))
                .unwrap_or(false);
            if !valid {
                return Err(AppError::Validation(format!("{} must be a valid email", col)));
            }
        }
        "uuid" => {
            if uuid::Uuid::parse_str(s).is_err() {
                return Err(AppError::Validation(format!("{} must be a valid UUID", col)));
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, EntityConfig, FieldConfig, FullConfig};
    use serde_json::json;

    fn entity() -> ResolvedEntity {
        let mut name = FieldConfig::new("name", FieldType::String);
        name.nullable = false;
        name.max_length = Some(5);
        let mut email = FieldConfig::new("email", FieldType::String);
        email.format = Some("email".into());
        let config = FullConfig {
            entities: vec![EntityConfig {
                id: "member".into(),
                name: "Member".into(),
                schema: None,
                table: None,
                id_field: Default::default(),
                fields: vec![
                    name,
                    email,
                    FieldConfig::new("joinedOn", FieldType::Date),
                    FieldConfig::new("lastSeen", FieldType::Timestamp),
                    FieldConfig::new("visits", FieldType::Integer),
                ],
            }],
            resources: vec![],
        };
        resolve(&config).unwrap().entities.remove(0)
    }

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn fills_missing_fields_with_null_and_ignores_identity() {
        let record = RequestValidator::validate(&entity(), &body(json!({"id": 99, "name": "Ada"}))).unwrap();
        assert_eq!(record["name"], json!("Ada"));
        assert_eq!(record["email"], Value::Null);
        assert_eq!(record["joined_on"], Value::Null);
        assert!(!record.contains_key("id"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = RequestValidator::validate(&entity(), &body(json!({"name": "Ada", "age": 3}))).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn enforces_required_and_length() {
        assert!(matches!(
            RequestValidator::validate(&entity(), &body(json!({"email": "a@b"}))),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            RequestValidator::validate(&entity(), &body(json!({"name": "Adelaide"}))),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn checks_types_and_formats() {
        let e = entity();
        assert!(RequestValidator::validate(&e, &body(json!({"name": "Ada", "email": "nope"}))).is_err());
        assert!(RequestValidator::validate(&e, &body(json!({"name": "Ada", "visits": "3"}))).is_err());
        assert!(RequestValidator::validate(&e, &body(json!({"name": 3}))).is_err());
        assert!(RequestValidator::validate(&e, &body(json!({"name": "Ada", "joinedOn": "2024-13-01"}))).is_err());
    }

    #[test]
    fn normalizes_timestamps_to_utc() {
        let record = RequestValidator::validate(
            &entity(),
            &body(json!({"name": "Ada", "lastSeen": "2024-05-01T12:00:00+02:00"})),
        )
        .unwrap();
        assert_eq!(record["last_seen"], json!("2024-05-01T10:00:00+00:00"));
    }
}
