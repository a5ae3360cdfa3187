//! Seed script loading: `INSERT ... VALUES` statements parsed and applied through any store.

use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::AppError;
use crate::service::RequestValidator;
use crate::store::{EntityId, EntityStore};
use serde_json::{Map, Value};
use sqlparser::ast::{self as sql_ast, Expr, SetExpr, Statement, UnaryOperator};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::path::Path;

/// One row from a seed script, keyed by JSON field name.
#[derive(Clone, Debug, PartialEq)]
pub struct SeedRow {
    pub entity_id: String,
    pub fields: Map<String, Value>,
}

/// Parse a seed script into rows. Only INSERT ... VALUES is understood; other statements are skipped.
pub fn parse_seed(model: &ResolvedModel, script: &str) -> Result<Vec<SeedRow>, AppError> {
    let statements = Parser::parse_sql(&PostgreSqlDialect {}, script)
        .map_err(|e| AppError::Seed(format!("parse error: {}", e)))?;
    let mut rows = Vec::new();
    for statement in statements {
        let insert = match statement {
            Statement::Insert(insert) => insert,
            other => {
                tracing::warn!(statement = %other, "skipping non-INSERT seed statement");
                continue;
            }
        };
        let table = table_name(&insert.table)?;
        let entity = model
            .entity_by_table(&table)
            .ok_or_else(|| AppError::Seed(format!("unknown table: {}", table)))?;
        let columns: Vec<String> = insert.columns.iter().map(|c| c.value.clone()).collect();
        if columns.is_empty() {
            return Err(AppError::Seed(format!("INSERT INTO {} must list its columns", table)));
        }
        let field_names = columns
            .iter()
            .map(|c| field_for_column(entity, c))
            .collect::<Result<Vec<_>, _>>()?;
        let Some(source) = insert.source else {
            return Err(AppError::Seed(format!("INSERT INTO {} has no VALUES", table)));
        };
        let SetExpr::Values(values) = *source.body else {
            return Err(AppError::Seed(format!("INSERT INTO {}: only VALUES is supported", table)));
        };
        for exprs in values.rows {
            if exprs.len() != field_names.len() {
                return Err(AppError::Seed(format!(
                    "INSERT INTO {}: {} columns but {} values",
                    table,
                    field_names.len(),
                    exprs.len()
                )));
            }
            let mut fields = Map::new();
            for (field, expr) in field_names.iter().zip(exprs.iter()) {
                fields.insert(field.clone(), literal(expr)?);
            }
            rows.push(SeedRow {
                entity_id: entity.entity_id.clone(),
                fields,
            });
        }
    }
    Ok(rows)
}

/// Apply parsed rows. Rows carrying an identity are upserted with it; others get one assigned.
pub async fn apply_seed(store: &dyn EntityStore, model: &ResolvedModel, rows: &[SeedRow]) -> Result<usize, AppError> {
    for row in rows {
        let entity = model
            .entities
            .iter()
            .find(|e| e.entity_id == row.entity_id)
            .ok_or_else(|| AppError::Seed(format!("unknown entity: {}", row.entity_id)))?;
        let record = RequestValidator::validate(entity, &row.fields)
            .map_err(|e| AppError::Seed(format!("{} row rejected: {}", entity.name, e)))?;
        match row.fields.get(&entity.id.field) {
            Some(id) if !id.is_null() => {
                let id = EntityId::from_json(id, entity.id.strategy)?;
                store.upsert(entity, &id, &record).await?;
            }
            _ => {
                store.insert(entity, &record).await?;
            }
        }
    }
    Ok(rows.len())
}

/// Read, parse and apply a seed file. A missing file is skipped unless `required`.
pub async fn load_seed_file(
    store: &dyn EntityStore,
    model: &ResolvedModel,
    path: &Path,
    required: bool,
) -> Result<usize, AppError> {
    let script = match tokio::fs::read_to_string(path).await {
        Ok(s) => s,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no seed script");
            return Ok(0);
        }
        Err(e) => return Err(AppError::Seed(format!("{}: {}", path.display(), e))),
    };
    let rows = parse_seed(model, &script)?;
    let n = apply_seed(store, model, &rows).await?;
    tracing::info!(path = %path.display(), rows = n, "seed script applied");
    Ok(n)
}

fn table_name(table: &sql_ast::TableObject) -> Result<String, AppError> {
    match table {
        sql_ast::TableObject::TableName(name) => Ok(name
            .0
            .iter()
            .filter_map(|part| match part {
                sql_ast::ObjectNamePart::Identifier(ident) => Some(ident.value.clone()),
                #[allow(unreachable_patterns)]
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(".")),
        other => Err(AppError::Seed(format!("unsupported INSERT target: {}", other))),
    }
}

fn field_for_column(entity: &ResolvedEntity, column: &str) -> Result<String, AppError> {
    if column.eq_ignore_ascii_case(&entity.id.column) {
        return Ok(entity.id.field.clone());
    }
    entity
        .columns
        .iter()
        .find(|c| c.column.eq_ignore_ascii_case(column))
        .map(|c| c.field.clone())
        .ok_or_else(|| AppError::Seed(format!("unknown column {}.{}", entity.table_name, column)))
}

fn literal(expr: &Expr) -> Result<Value, AppError> {
    match expr {
        Expr::Value(v) => literal_value(&v.value),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match literal(expr)? {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Number((-i).into()))
                } else {
                    let f = n.as_f64().unwrap_or(0.0);
                    serde_json::Number::from_f64(-f)
                        .map(Value::Number)
                        .ok_or_else(|| AppError::Seed(format!("invalid number: -{}", n)))
                }
            }
            other => Err(AppError::Seed(format!("cannot negate {}", other))),
        },
        Expr::Nested(inner) => literal(inner),
        other => Err(AppError::Seed(format!("unsupported seed value: {}", other))),
    }
}

fn literal_value(v: &sql_ast::Value) -> Result<Value, AppError> {
    match v {
        sql_ast::Value::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Value::Number(i.into()))
            } else {
                n.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| AppError::Seed(format!("invalid number: {}", n)))
            }
        }
        sql_ast::Value::SingleQuotedString(s) | sql_ast::Value::EscapedStringLiteral(s) => Ok(Value::String(s.clone())),
        sql_ast::Value::Boolean(b) => Ok(Value::Bool(*b)),
        sql_ast::Value::Null => Ok(Value::Null),
        other => Err(AppError::Seed(format!("unsupported seed value: {}", other))),
    }
}
