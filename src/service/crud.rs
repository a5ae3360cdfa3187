//! CrudService: the generated CRUD contract for one resource, independent of HTTP and storage.

use crate::config::{Operation, ResolvedEntity, ResolvedResource};
use crate::error::AppError;
use crate::service::RequestValidator;
use crate::store::{EntityId, EntityStore, ListQuery, Page, Record, SortDirection, SortKey, Upserted};
use serde_json::{Map, Value};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Page position reported alongside a paged listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageInfo {
    pub index: u32,
    pub size: u32,
    pub total: u64,
}

impl PageInfo {
    /// Number of pages; an empty collection still has one (empty) page.
    pub fn page_count(&self) -> u32 {
        let pages = self.total.div_ceil(self.size as u64).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn last_index(&self) -> u32 {
        self.page_count() - 1
    }
}

#[derive(Debug)]
pub struct Listing {
    pub items: Vec<Value>,
    pub page: Option<PageInfo>,
}

/// Outcome of an update: replaced in place, or created with the requested identity.
#[derive(Debug)]
pub enum UpdateOutcome {
    Replaced,
    Created { id: EntityId, body: Value },
}

/// Permit for one operation, handed out by `CrudService::ensure_exposed` only.
/// Every CRUD entry point takes one, so the exposure check runs exactly once per call.
#[derive(Clone, Copy, Debug)]
pub struct Exposed(Operation);

impl Exposed {
    fn check(self, op: Operation) -> Result<(), AppError> {
        if self.0 == op {
            Ok(())
        } else {
            Err(AppError::Internal(format!("{} permit used for {}", self.0, op)))
        }
    }
}

pub struct CrudService;

impl CrudService {
    /// Fails when the operation is suppressed for this resource. Call it before reading any input.
    pub fn ensure_exposed(resource: &ResolvedResource, op: Operation) -> Result<Exposed, AppError> {
        if resource.is_exposed(op) {
            Ok(Exposed(op))
        } else {
            tracing::debug!(resource = %resource.name, operation = %op, "operation not exposed");
            Err(AppError::NotExposed {
                resource: resource.name.clone(),
                operation: op.as_str(),
            })
        }
    }

    /// List records. `params` are the raw query pairs; `sort` is honoured always,
    /// `page`/`size` only for paged resources.
    pub async fn list(
        store: &dyn EntityStore,
        resource: &ResolvedResource,
        permit: Exposed,
        params: &[(String, String)],
    ) -> Result<Listing, AppError> {
        permit.check(Operation::List)?;
        let entity = &resource.entity;
        let mut query = ListQuery {
            sort: parse_sort(entity, params)?,
            page: None,
        };
        if resource.paged {
            query.page = Some(parse_page(params)?);
        }
        let rows = store.list(entity, &query).await?;
        let page = match query.page {
            Some(p) => Some(PageInfo {
                index: p.index,
                size: p.size,
                total: store.count(entity).await?,
            }),
            None => None,
        };
        Ok(Listing {
            items: rows.iter().map(|r| to_api(entity, r)).collect(),
            page,
        })
    }

    pub async fn get(
        store: &dyn EntityStore,
        resource: &ResolvedResource,
        permit: Exposed,
        id_str: &str,
    ) -> Result<Value, AppError> {
        permit.check(Operation::Get)?;
        let entity = &resource.entity;
        let id = EntityId::parse(id_str, entity.id.strategy)?;
        let row = store
            .get(entity, &id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{}/{}", resource.path, id_str)))?;
        Ok(to_api(entity, &row))
    }

    /// Create a record; an identity in the payload is ignored. Returns the assigned identity and the stored record.
    pub async fn create(
        store: &dyn EntityStore,
        resource: &ResolvedResource,
        permit: Exposed,
        body: &[u8],
    ) -> Result<(EntityId, Value), AppError> {
        permit.check(Operation::Create)?;
        let entity = &resource.entity;
        let body = parse_body(body)?;
        let record = RequestValidator::validate(entity, &body)?;
        let row = store.insert(entity, &record).await?;
        let id = stored_id(entity, &row)?;
        tracing::info!(resource = %resource.name, id = %id, "created");
        Ok((id, to_api(entity, &row)))
    }

    /// Replace the record with this identity, or create it when absent.
    pub async fn update(
        store: &dyn EntityStore,
        resource: &ResolvedResource,
        permit: Exposed,
        id_str: &str,
        body: &[u8],
    ) -> Result<UpdateOutcome, AppError> {
        permit.check(Operation::Update)?;
        let entity = &resource.entity;
        let id = EntityId::parse(id_str, entity.id.strategy)?;
        let body = parse_body(body)?;
        let record = RequestValidator::validate(entity, &body)?;
        Ok(match store.upsert(entity, &id, &record).await? {
            Upserted::Replaced(_) => {
                tracing::info!(resource = %resource.name, id = %id, "replaced");
                UpdateOutcome::Replaced
            }
            Upserted::Created(row) => {
                tracing::info!(resource = %resource.name, id = %id, "created by update");
                UpdateOutcome::Created {
                    id,
                    body: to_api(entity, &row),
                }
            }
        })
    }

    pub async fn delete(
        store: &dyn EntityStore,
        resource: &ResolvedResource,
        permit: Exposed,
        id_str: &str,
    ) -> Result<(), AppError> {
        permit.check(Operation::Delete)?;
        let entity = &resource.entity;
        let id = EntityId::parse(id_str, entity.id.strategy)?;
        if !store.delete(entity, &id).await? {
            return Err(AppError::NotFound(format!("{}/{}", resource.path, id_str)));
        }
        tracing::info!(resource = %resource.name, id = %id, "deleted");
        Ok(())
    }
}

fn parse_body(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("request body is required".into()));
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(m)) => Ok(m),
        Ok(_) => Err(AppError::BadRequest("body must be a JSON object".into())),
        Err(e) => Err(AppError::BadRequest(format!("invalid JSON body: {}", e))),
    }
}

fn stored_id(entity: &ResolvedEntity, row: &Record) -> Result<EntityId, AppError> {
    let v = row
        .get(&entity.id.column)
        .ok_or_else(|| AppError::Internal(format!("stored {} has no identity", entity.name)))?;
    EntityId::from_json(v, entity.id.strategy)
}

/// Column-keyed record to the JSON shape clients see (field names).
pub fn to_api(entity: &ResolvedEntity, row: &Record) -> Value {
    let mut out = Map::new();
    out.insert(
        entity.id.field.clone(),
        row.get(&entity.id.column).cloned().unwrap_or(Value::Null),
    );
    for c in &entity.columns {
        out.insert(c.field.clone(), row.get(&c.column).cloned().unwrap_or(Value::Null));
    }
    Value::Object(out)
}

/// `sort=name,-email` (repeatable). A leading '-' sorts descending.
fn parse_sort(entity: &ResolvedEntity, params: &[(String, String)]) -> Result<Vec<SortKey>, AppError> {
    let mut keys = Vec::new();
    for (_, raw) in params.iter().filter(|(k, _)| k == "sort") {
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (direction, field) = match part.strip_prefix('-') {
                Some(f) => (SortDirection::Desc, f),
                None => (SortDirection::Asc, part.strip_prefix('+').unwrap_or(part)),
            };
            let column = if field == entity.id.field {
                entity.id.column.clone()
            } else {
                entity
                    .column_by_field(field)
                    .map(|c| c.column.clone())
                    .ok_or_else(|| AppError::BadRequest(format!("unknown sort field: {}", field)))?
            };
            keys.push(SortKey { column, direction });
        }
    }
    Ok(keys)
}

fn parse_page(params: &[(String, String)]) -> Result<Page, AppError> {
    let lookup = |name: &str| params.iter().rev().find(|(k, _)| k == name).map(|(_, v)| v.as_str());
    let index = match lookup("page") {
        Some(v) => v
            .parse::<u32>()
            .map_err(|_| AppError::BadRequest(format!("invalid page: {}", v)))?,
        None => 0,
    };
    let size = match lookup("size") {
        Some(v) => v
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=MAX_PAGE_SIZE).contains(n))
            .ok_or_else(|| AppError::BadRequest(format!("size must be between 1 and {}", MAX_PAGE_SIZE)))?,
        None => DEFAULT_PAGE_SIZE,
    };
    Ok(Page { index, size })
}
