//! REST data: CRUD resources generated from entity and resource definitions.

pub mod app;
pub mod case;
pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod response;
pub mod routes;
pub mod seed;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use app::{bootstrap, connect_store, init_app, load_model};
pub use config::{load_from_dir, resolve, FullConfig, Operation, ResolvedEntity, ResolvedModel, ResolvedResource};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use routes::{build_router, common_routes_with_ready, entity_routes};
pub use service::CrudService;
pub use settings::{SchemaGeneration, Settings, StoreBackend};
pub use state::AppState;
pub use store::{ensure_database_exists, EntityStore, MemoryStore, PgStore};
