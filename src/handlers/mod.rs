//! HTTP handlers for the generated resources and the OpenAPI document.

pub mod entity;
pub mod openapi;
pub use entity::*;
pub use openapi::{openapi, openapi_document};
