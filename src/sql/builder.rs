//! Builds parameterized SELECT, INSERT, UPSERT, DELETE and DDL from a resolved entity.

use super::params::PgBindValue;
use crate::config::{IdStrategy, ResolvedEntity};
use crate::store::{EntityId, ListQuery, Record, SortDirection};

/// Column alias reporting whether an upsert inserted (true) or updated (false).
pub const INSERTED_FLAG: &str = "__inserted";

/// Quote identifier for PostgreSQL (safe: only from config).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(entity: &ResolvedEntity) -> String {
    format!("{}.{}", quoted(&entity.schema_name), quoted(&entity.table_name))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a parameter and return its placeholder with an explicit cast.
    fn push_param(&mut self, v: PgBindValue, pg_type: &str) -> String {
        self.params.push(v);
        format!("${}::{}", self.params.len(), pg_type)
    }
}

/// Identity first, then attribute columns in declaration order.
fn select_column_list(entity: &ResolvedEntity) -> String {
    std::iter::once(quoted(&entity.id.column))
        .chain(entity.columns.iter().map(|c| quoted(&c.column)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT by primary key.
pub fn select_by_id(entity: &ResolvedEntity, id: &EntityId) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(PgBindValue::from_id(id), entity.id.pg_type());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(entity),
        qualified_table(entity),
        quoted(&entity.id.column),
        ph
    );
    q
}

/// SELECT list ordered by the requested sort keys, then identity; optional LIMIT/OFFSET.
/// Sort columns must already be checked against the entity.
pub fn select_list(entity: &ResolvedEntity, query: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut order: Vec<String> = query
        .sort
        .iter()
        .map(|k| {
            let dir = match k.direction {
                SortDirection::Asc => "ASC",
                SortDirection::Desc => "DESC",
            };
            format!("{} {}", quoted(&k.column), dir)
        })
        .collect();
    order.push(format!("{} ASC", quoted(&entity.id.column)));
    let window = query
        .page
        .map(|p| format!(" LIMIT {} OFFSET {}", p.size, p.offset()))
        .unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}{}",
        select_column_list(entity),
        qualified_table(entity),
        order.join(", "),
        window
    );
    q
}

pub fn select_count(entity: &ResolvedEntity) -> String {
    format!("SELECT COUNT(*) FROM {}", qualified_table(entity))
}

/// INSERT every attribute column; the identity comes from the column default.
pub fn insert(entity: &ResolvedEntity, record: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::with_capacity(entity.columns.len());
    let mut placeholders = Vec::with_capacity(entity.columns.len());
    for c in &entity.columns {
        let v = PgBindValue::for_column(record.get(&c.column), c);
        placeholders.push(q.push_param(v, c.pg_type()));
        cols.push(quoted(&c.column));
    }
    let table = qualified_table(entity);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, select_column_list(entity))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            select_column_list(entity)
        )
    };
    q
}

/// INSERT with an explicit identity, replacing every attribute on conflict.
/// `xmax = 0` holds only for freshly inserted tuples, so the flag tells create from replace.
pub fn upsert(entity: &ResolvedEntity, id: &EntityId, record: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_col = quoted(&entity.id.column);
    let mut cols = vec![id_col.clone()];
    let mut placeholders = vec![q.push_param(PgBindValue::from_id(id), entity.id.pg_type())];
    let mut sets = Vec::with_capacity(entity.columns.len());
    for c in &entity.columns {
        let v = PgBindValue::for_column(record.get(&c.column), c);
        placeholders.push(q.push_param(v, c.pg_type()));
        let col = quoted(&c.column);
        sets.push(format!("{} = EXCLUDED.{}", col, col));
        cols.push(col);
    }
    // Touch the identity so a conflict always yields a returned row.
    if sets.is_empty() {
        sets.push(format!("{} = EXCLUDED.{}", id_col, id_col));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {} RETURNING {}, (xmax = 0) AS {}",
        qualified_table(entity),
        cols.join(", "),
        placeholders.join(", "),
        id_col,
        sets.join(", "),
        select_column_list(entity),
        quoted(INSERTED_FLAG)
    );
    q
}

/// DELETE by id.
pub fn delete(entity: &ResolvedEntity, id: &EntityId) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(PgBindValue::from_id(id), entity.id.pg_type());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {}",
        qualified_table(entity),
        quoted(&entity.id.column),
        ph
    );
    q
}

/// Move the identity sequence past the highest stored id without ever moving it backwards.
/// Returns None for entities without a sequence.
pub fn sync_sequence(entity: &ResolvedEntity) -> Option<QueryBuf> {
    if entity.id.strategy != IdStrategy::Sequence {
        return None;
    }
    let mut q = QueryBuf::new();
    let table_ph = q.push_param(PgBindValue::String(qualified_table(entity)), "text");
    let col_ph = q.push_param(PgBindValue::String(entity.id.column.clone()), "text");
    // is_called = true: the next nextval is one past the stored value, so MAX(id) = i64::MAX
    // leaves the sequence exhausted instead of overflowing here.
    q.sql = format!(
        "SELECT setval(pg_get_serial_sequence({t}, {c}), GREATEST((SELECT COALESCE(MAX({id}), 0) FROM {table}), COALESCE(pg_sequence_last_value(pg_get_serial_sequence({t}, {c})::regclass), 0), 1), true)",
        t = table_ph,
        c = col_ph,
        id = quoted(&entity.id.column),
        table = qualified_table(entity)
    );
    Some(q)
}

/// CREATE TABLE for an entity. `if_not_exists` keeps an existing table.
pub fn create_table(entity: &ResolvedEntity, if_not_exists: bool) -> String {
    let id_def = match entity.id.strategy {
        IdStrategy::Sequence => format!("{} BIGSERIAL PRIMARY KEY", quoted(&entity.id.column)),
        IdStrategy::Uuid => format!(
            "{} UUID PRIMARY KEY DEFAULT gen_random_uuid()",
            quoted(&entity.id.column)
        ),
    };
    let mut defs = vec![id_def];
    for c in &entity.columns {
        let mut def = format!("{} {}", quoted(&c.column), c.ddl_type());
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        defs.push(def);
    }
    format!(
        "CREATE TABLE {}{} ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        qualified_table(entity),
        defs.join(", ")
    )
}

pub fn drop_table(entity: &ResolvedEntity) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", qualified_table(entity))
}

pub fn create_schema(entity: &ResolvedEntity) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(&entity.schema_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnInfo, FieldType, IdColumn};
    use crate::store::{Page, SortKey};
    use serde_json::json;

    fn column(name: &str, type_: FieldType, nullable: bool) -> ColumnInfo {
        ColumnInfo {
            field: name.into(),
            column: name.into(),
            type_,
            nullable,
            max_length: None,
            min_length: None,
            pattern: None,
            format: None,
        }
    }

    fn member() -> ResolvedEntity {
        ResolvedEntity {
            entity_id: "member".into(),
            name: "Member".into(),
            schema_name: "public".into(),
            table_name: "member".into(),
            id: IdColumn {
                field: "id".into(),
                column: "id".into(),
                strategy: IdStrategy::Sequence,
            },
            columns: vec![
                column("name", FieldType::String, false),
                column("email", FieldType::String, true),
            ],
        }
    }

    #[test]
    fn select_by_id_casts_identity() {
        let q = select_by_id(&member(), &EntityId::Int(3));
        assert_eq!(
            q.sql,
            r#"SELECT "id", "name", "email" FROM "public"."member" WHERE "id" = $1::bigint"#
        );
        assert_eq!(q.params.len(), 1);
    }

    #[test]
    fn select_list_orders_by_sort_then_id() {
        let query = ListQuery {
            sort: vec![SortKey {
                column: "name".into(),
                direction: SortDirection::Desc,
            }],
            page: Some(Page { index: 2, size: 10 }),
        };
        let q = select_list(&member(), &query);
        assert!(q.sql.ends_with(r#"ORDER BY "name" DESC, "id" ASC LIMIT 10 OFFSET 20"#));
    }

    #[test]
    fn insert_binds_every_attribute() {
        let mut record = Record::new();
        record.insert("name".into(), json!("Ada"));
        let q = insert(&member(), &record);
        assert_eq!(
            q.sql,
            r#"INSERT INTO "public"."member" ("name", "email") VALUES ($1::varchar, $2::varchar) RETURNING "id", "name", "email""#
        );
        assert!(matches!(q.params[1], PgBindValue::Null));
    }

    #[test]
    fn upsert_reports_insert_flag() {
        let q = upsert(&member(), &EntityId::Int(9), &Record::new());
        assert!(q.sql.contains(r#"ON CONFLICT ("id") DO UPDATE SET "name" = EXCLUDED."name", "email" = EXCLUDED."email""#));
        assert!(q.sql.ends_with(r#"(xmax = 0) AS "__inserted""#));
        assert_eq!(q.params.len(), 3);
    }

    #[test]
    fn ddl_for_sequence_entity() {
        assert_eq!(
            create_table(&member(), false),
            r#"CREATE TABLE "public"."member" ("id" BIGSERIAL PRIMARY KEY, "name" VARCHAR(255) NOT NULL, "email" VARCHAR(255))"#
        );
    }

    #[test]
    fn sequence_sync_never_adds_past_max_id() {
        let q = sync_sequence(&member()).unwrap();
        assert_eq!(
            q.sql,
            r#"SELECT setval(pg_get_serial_sequence($1::text, $2::text), GREATEST((SELECT COALESCE(MAX("id"), 0) FROM "public"."member"), COALESCE(pg_sequence_last_value(pg_get_serial_sequence($1::text, $2::text)::regclass), 0), 1), true)"#
        );
        assert!(!q.sql.contains("+ 1"));
    }

    #[test]
    fn no_sequence_sync_for_uuid_identity() {
        let mut e = member();
        e.id.strategy = IdStrategy::Uuid;
        assert!(sync_sequence(&e).is_none());
        assert!(create_table(&e, true).contains(r#""id" UUID PRIMARY KEY DEFAULT gen_random_uuid()"#));
    }
}
