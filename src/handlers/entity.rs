//! Generated CRUD handlers. Each handler checks exposure before touching the request input,
//! so a suppressed operation fails the same way whatever the client sent.

use crate::config::Operation;
use crate::error::AppError;
use crate::response::{
    collection_href, created, hal_collection, hal_record, json_response, page_links, record_href, wants_hal,
};
use crate::service::{CrudService, UpdateOutcome};
use crate::state::ResourceState;
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;

type QueryPairs = Vec<(String, String)>;

fn path_id(id: Result<Path<String>, PathRejection>) -> Result<String, AppError> {
    id.map(|Path(id)| id)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

fn body_bytes(body: Result<Bytes, BytesRejection>) -> Result<Bytes, AppError> {
    body.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => AppError::PayloadTooLarge(rejection.body_text()),
        _ => AppError::BadRequest(rejection.body_text()),
    })
}

pub async fn list(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Response, AppError> {
    let permit = CrudService::ensure_exposed(&state.resource, Operation::List)?;
    let Query(params) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let listing = CrudService::list(state.store.as_ref(), &state.resource, permit, &params).await?;
    let hal = wants_hal(&state.resource, &headers);
    let body = if hal {
        hal_collection(&state.root_path, &state.resource, listing.items)
    } else {
        Value::Array(listing.items)
    };
    let mut response = json_response(StatusCode::OK, &body, hal);
    if let Some(page) = listing.page {
        let sort: Vec<&str> = params
            .iter()
            .filter(|(k, _)| k == "sort")
            .map(|(_, v)| v.as_str())
            .collect();
        let links = page_links(&collection_href(&state.root_path, &state.resource), &sort, &page);
        if let Ok(v) = HeaderValue::from_str(&links) {
            response.headers_mut().insert(header::LINK, v);
        }
        response
            .headers_mut()
            .insert("x-total-count", HeaderValue::from(page.total));
    }
    Ok(response)
}

pub async fn read(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    id: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    let permit = CrudService::ensure_exposed(&state.resource, Operation::Get)?;
    let id = path_id(id)?;
    let record = CrudService::get(state.store.as_ref(), &state.resource, permit, &id).await?;
    let hal = wants_hal(&state.resource, &headers);
    let body = if hal {
        hal_record(&state.root_path, &state.resource, record)
    } else {
        record
    };
    Ok(json_response(StatusCode::OK, &body, hal))
}

pub async fn create(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let permit = CrudService::ensure_exposed(&state.resource, Operation::Create)?;
    let body = body_bytes(body)?;
    let (id, record) = CrudService::create(state.store.as_ref(), &state.resource, permit, &body).await?;
    let hal = wants_hal(&state.resource, &headers);
    let location = record_href(&state.root_path, &state.resource, &id.to_string());
    let record = if hal {
        hal_record(&state.root_path, &state.resource, record)
    } else {
        record
    };
    Ok(created(&location, &record, hal))
}

/// PUT: 204 when an existing record was replaced, 201 with Location when it was created.
pub async fn update(
    State(state): State<ResourceState>,
    headers: HeaderMap,
    id: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, AppError> {
    let permit = CrudService::ensure_exposed(&state.resource, Operation::Update)?;
    let id = path_id(id)?;
    let body = body_bytes(body)?;
    match CrudService::update(state.store.as_ref(), &state.resource, permit, &id, &body).await? {
        UpdateOutcome::Replaced => Ok(StatusCode::NO_CONTENT.into_response()),
        UpdateOutcome::Created { id, body } => {
            let hal = wants_hal(&state.resource, &headers);
            let location = record_href(&state.root_path, &state.resource, &id.to_string());
            let body = if hal {
                hal_record(&state.root_path, &state.resource, body)
            } else {
                body
            };
            Ok(created(&location, &body, hal))
        }
    }
}

pub async fn delete(
    State(state): State<ResourceState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    let permit = CrudService::ensure_exposed(&state.resource, Operation::Delete)?;
    let id = path_id(id)?;
    CrudService::delete(state.store.as_ref(), &state.resource, permit, &id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
