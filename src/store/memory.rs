//! In-process store: one ordered map per table behind a tokio RwLock.

use super::{EntityId, EntityStore, ListQuery, Record, SortDirection, Upserted};
use crate::config::{IdStrategy, ResolvedEntity};
use crate::error::AppError;
use crate::settings::SchemaGeneration;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

struct Table {
    rows: BTreeMap<EntityId, Record>,
    /// Next value handed out under the sequence strategy; `None` once `i64::MAX` is taken.
    next_seq: Option<i64>,
}

impl Default for Table {
    fn default() -> Self {
        Table {
            rows: BTreeMap::new(),
            next_seq: Some(1),
        }
    }
}

impl Table {
    /// Never hands out an identity already present in the table.
    fn assign_id(&mut self, entity: &ResolvedEntity) -> Result<EntityId, AppError> {
        match entity.id.strategy {
            IdStrategy::Sequence => loop {
                let n = self
                    .next_seq
                    .ok_or_else(|| AppError::IdentityExhausted(entity.name.clone()))?;
                self.next_seq = n.checked_add(1);
                let id = EntityId::Int(n);
                if !self.rows.contains_key(&id) {
                    return Ok(id);
                }
            },
            IdStrategy::Uuid => loop {
                let id = EntityId::Uuid(uuid::Uuid::new_v4());
                if !self.rows.contains_key(&id) {
                    return Ok(id);
                }
            },
        }
    }

    fn observe_explicit_id(&mut self, id: &EntityId) {
        if let (EntityId::Int(n), Some(next)) = (id, self.next_seq) {
            if *n >= next {
                self.next_seq = n.checked_add(1);
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn table_key(entity: &ResolvedEntity) -> String {
    format!("{}.{}", entity.schema_name, entity.table_name)
}

fn with_id(entity: &ResolvedEntity, id: &EntityId, record: &Record) -> Record {
    let mut row = Record::new();
    row.insert(entity.id.column.clone(), id.to_json());
    for c in &entity.columns {
        row.insert(c.column.clone(), record.get(&c.column).cloned().unwrap_or(Value::Null));
    }
    row
}

/// Order as PostgreSQL does by default: NULL sorts after every value ascending.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn prepare(&self, entities: &[ResolvedEntity], generation: SchemaGeneration) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        for entity in entities {
            let key = table_key(entity);
            if generation == SchemaGeneration::DropAndCreate {
                tables.insert(key, Table::default());
            } else {
                tables.entry(key).or_default();
            }
        }
        Ok(())
    }

    async fn list(&self, entity: &ResolvedEntity, query: &ListQuery) -> Result<Vec<Record>, AppError> {
        let tables = self.tables.read().await;
        let Some(table) = tables.get(&table_key(entity)) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<(&EntityId, &Record)> = table.rows.iter().collect();
        if !query.sort.is_empty() {
            rows.sort_by(|(ida, a), (idb, b)| {
                for key in &query.sort {
                    let va = a.get(&key.column).unwrap_or(&Value::Null);
                    let vb = b.get(&key.column).unwrap_or(&Value::Null);
                    let ord = compare_values(va, vb);
                    let ord = match key.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                ida.cmp(idb)
            });
        }
        let iter = rows.into_iter().map(|(_, r)| r.clone());
        Ok(match query.page {
            Some(page) => iter
                .skip(page.offset() as usize)
                .take(page.size as usize)
                .collect(),
            None => iter.collect(),
        })
    }

    async fn count(&self, entity: &ResolvedEntity) -> Result<u64, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&table_key(entity))
            .map(|t| t.rows.len() as u64)
            .unwrap_or(0))
    }

    async fn get(&self, entity: &ResolvedEntity, id: &EntityId) -> Result<Option<Record>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&table_key(entity))
            .and_then(|t| t.rows.get(id))
            .cloned())
    }

    async fn insert(&self, entity: &ResolvedEntity, record: &Record) -> Result<Record, AppError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(table_key(entity)).or_default();
        let id = table.assign_id(entity)?;
        let row = with_id(entity, &id, record);
        table.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn upsert(&self, entity: &ResolvedEntity, id: &EntityId, record: &Record) -> Result<Upserted, AppError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(table_key(entity)).or_default();
        let row = with_id(entity, id, record);
        let previous = table.rows.insert(id.clone(), row.clone());
        table.observe_explicit_id(id);
        Ok(match previous {
            Some(_) => Upserted::Replaced(row),
            None => Upserted::Created(row),
        })
    }

    async fn delete(&self, entity: &ResolvedEntity, id: &EntityId) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .get_mut(&table_key(entity))
            .map(|t| t.rows.remove(id).is_some())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnInfo, FieldType, IdColumn};
    use crate::store::{Page, SortKey};
    use serde_json::json;

    fn entity() -> ResolvedEntity {
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
            columns: vec![ColumnInfo {
                field: "name".into(),
                column: "name".into(),
                type_: FieldType::String,
                nullable: true,
                max_length: None,
                min_length: None,
                pattern: None,
                format: None,
            }],
        }
    }

    fn record(name: Value) -> Record {
        let mut r = Record::new();
        r.insert("name".into(), name);
        r
    }

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let store = MemoryStore::new();
        let e = entity();
        let a = store.insert(&e, &record(json!("a"))).await.unwrap();
        let b = store.insert(&e, &record(json!("b"))).await.unwrap();
        assert_eq!(a["id"], json!(1));
        assert_eq!(b["id"], json!(2));
    }

    #[tokio::test]
    async fn explicit_ids_advance_the_sequence() {
        let store = MemoryStore::new();
        let e = entity();
        let up = store.upsert(&e, &EntityId::Int(10), &record(json!("seeded"))).await.unwrap();
        assert!(matches!(up, Upserted::Created(_)));
        let next = store.insert(&e, &record(json!("next"))).await.unwrap();
        assert_eq!(next["id"], json!(11));
        let again = store.upsert(&e, &EntityId::Int(10), &record(json!("renamed"))).await.unwrap();
        assert!(matches!(again, Upserted::Replaced(r) if r["name"] == json!("renamed")));
    }

    #[tokio::test]
    async fn exhausted_sequence_is_an_error_not_an_overwrite() {
        let store = MemoryStore::new();
        let e = entity();
        let top = EntityId::Int(i64::MAX);
        store.upsert(&e, &top, &record(json!("top"))).await.unwrap();
        let err = store.insert(&e, &record(json!("next"))).await.unwrap_err();
        assert!(matches!(err, AppError::IdentityExhausted(_)));
        assert_eq!(store.count(&e).await.unwrap(), 1);
        let kept = store.get(&e, &top).await.unwrap().unwrap();
        assert_eq!(kept["name"], json!("top"));
    }

    #[tokio::test]
    async fn lower_explicit_ids_do_not_rewind_the_sequence() {
        let store = MemoryStore::new();
        let e = entity();
        store.upsert(&e, &EntityId::Int(5), &record(json!("five"))).await.unwrap();
        store.upsert(&e, &EntityId::Int(2), &record(json!("two"))).await.unwrap();
        let next = store.insert(&e, &record(json!("next"))).await.unwrap();
        assert_eq!(next["id"], json!(6));
    }

    #[test]
    fn large_integers_sort_exactly() {
        let a = json!(9_007_199_254_740_993i64);
        let b = json!(9_007_199_254_740_992i64);
        assert_eq!(compare_values(&a, &b), Ordering::Greater);
        assert_eq!(compare_values(&json!(1.5), &json!(2)), Ordering::Less);
    }

    #[tokio::test]
    async fn sorts_with_nulls_last_and_pages() {
        let store = MemoryStore::new();
        let e = entity();
        for name in [json!("b"), Value::Null, json!("a"), json!("c")] {
            store.insert(&e, &record(name)).await.unwrap();
        }
        let query = ListQuery {
            sort: vec![SortKey {
                column: "name".into(),
                direction: SortDirection::Asc,
            }],
            page: None,
        };
        let names: Vec<Value> = store
            .list(&e, &query)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r["name"].clone())
            .collect();
        assert_eq!(names, vec![json!("a"), json!("b"), json!("c"), Value::Null]);

        let paged = ListQuery {
            sort: vec![],
            page: Some(Page { index: 1, size: 3 }),
        };
        let rows = store.list(&e, &paged).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!(4));
    }

    #[tokio::test]
    async fn drop_and_create_clears_rows() {
        let store = MemoryStore::new();
        let e = entity();
        store.insert(&e, &record(json!("a"))).await.unwrap();
        store
            .prepare(std::slice::from_ref(&e), SchemaGeneration::Create)
            .await
            .unwrap();
        assert_eq!(store.count(&e).await.unwrap(), 1);
        store
            .prepare(std::slice::from_ref(&e), SchemaGeneration::DropAndCreate)
            .await
            .unwrap();
        assert_eq!(store.count(&e).await.unwrap(), 0);
        assert!(!store.delete(&e, &EntityId::Int(1)).await.unwrap());
    }
}
