//! PostgreSQL store: parameterized SQL over a sqlx pool.

use super::{EntityId, EntityStore, ListQuery, Record, Upserted};
use crate::config::{ColumnInfo, FieldType, IdStrategy, ResolvedEntity};
use crate::error::AppError;
use crate::migration::apply_migrations;
use crate::settings::SchemaGeneration;
use crate::sql::{self, QueryBuf, INSERTED_FLAG};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{ConnectOptions, PgPool, Row};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn build<'q>(q: &'q QueryBuf) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        query
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }

    async fn prepare(&self, entities: &[ResolvedEntity], generation: SchemaGeneration) -> Result<(), AppError> {
        apply_migrations(&self.pool, entities, generation).await
    }

    async fn list(&self, entity: &ResolvedEntity, query: &ListQuery) -> Result<Vec<Record>, AppError> {
        let q = sql::select_list(entity, query);
        let rows = Self::build(&q).fetch_all(&self.pool).await?;
        rows.iter().map(|r| row_to_record(r, entity)).collect()
    }

    async fn count(&self, entity: &ResolvedEntity) -> Result<u64, AppError> {
        let sql = sql::select_count(entity);
        tracing::debug!(sql = %sql, "query");
        let n: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(n.max(0) as u64)
    }

    async fn get(&self, entity: &ResolvedEntity, id: &EntityId) -> Result<Option<Record>, AppError> {
        let q = sql::select_by_id(entity, id);
        let row = Self::build(&q).fetch_optional(&self.pool).await?;
        row.as_ref().map(|r| row_to_record(r, entity)).transpose()
    }

    async fn insert(&self, entity: &ResolvedEntity, record: &Record) -> Result<Record, AppError> {
        let q = sql::insert(entity, record);
        let row = Self::build(&q)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| insert_error(e, entity))?;
        row_to_record(&row, entity)
    }

    async fn upsert(&self, entity: &ResolvedEntity, id: &EntityId, record: &Record) -> Result<Upserted, AppError> {
        let q = sql::upsert(entity, id, record);
        let mut tx = self.pool.begin().await?;
        let row = Self::build(&q).fetch_one(&mut *tx).await?;
        let inserted: bool = row.try_get(INSERTED_FLAG)?;
        if inserted {
            if let Some(sync) = sql::sync_sequence(entity) {
                Self::build(&sync).execute(&mut *tx).await?;
            }
        }
        tx.commit().await?;
        let record = row_to_record(&row, entity)?;
        Ok(if inserted {
            Upserted::Created(record)
        } else {
            Upserted::Replaced(record)
        })
    }

    async fn delete(&self, entity: &ResolvedEntity, id: &EntityId) -> Result<bool, AppError> {
        let q = sql::delete(entity, id);
        let result = Self::build(&q).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

/// SQLSTATE 2200H (sequence_generator_limit_exceeded) means every identity is taken.
fn insert_error(e: sqlx::Error, entity: &ResolvedEntity) -> AppError {
    let exhausted = matches!(&e, sqlx::Error::Database(db) if db.code().as_deref() == Some("2200H"));
    if exhausted {
        AppError::IdentityExhausted(entity.name.clone())
    } else {
        AppError::Db(e)
    }
}

fn row_to_record(row: &PgRow, entity: &ResolvedEntity) -> Result<Record, AppError> {
    let mut map = Record::new();
    let id = match entity.id.strategy {
        IdStrategy::Sequence => EntityId::Int(row.try_get::<i64, _>(entity.id.column.as_str())?),
        IdStrategy::Uuid => EntityId::Uuid(row.try_get::<uuid::Uuid, _>(entity.id.column.as_str())?),
    };
    map.insert(entity.id.column.clone(), id.to_json());
    for c in &entity.columns {
        map.insert(c.column.clone(), cell_to_value(row, c)?);
    }
    Ok(map)
}

fn cell_to_value(row: &PgRow, column: &ColumnInfo) -> Result<Value, AppError> {
    let name = column.column.as_str();
    Ok(match column.type_ {
        FieldType::String => row.try_get::<Option<String>, _>(name)?.map(Value::String),
        FieldType::Integer => row.try_get::<Option<i64>, _>(name)?.map(|n| Value::Number(n.into())),
        FieldType::Number => row
            .try_get::<Option<f64>, _>(name)?
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        FieldType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
        FieldType::Date => row
            .try_get::<Option<chrono::NaiveDate>, _>(name)?
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        FieldType::Timestamp => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name)?
            .map(|d| Value::String(d.to_rfc3339())),
    }
    .unwrap_or(Value::Null))
}

/// Create the database named in `database_url` when it does not exist yet.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let mut parts = path_and_query.splitn(2, '?');
    let db_name = parts.next().unwrap_or("").trim();
    let query = parts.next().map(|q| format!("?{}", q)).unwrap_or_default();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres{}", base, query);
    Ok((admin_url, db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_database_name() {
        let (admin, name) = parse_db_name_from_url("postgres://u:p@localhost:5432/rest_data").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(name, "rest_data");
    }

    #[test]
    fn keeps_query_parameters() {
        let (admin, name) = parse_db_name_from_url("postgres://localhost/app?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://localhost/postgres?sslmode=disable");
        assert_eq!(name, "app");
    }
}
