//! Startup sequence: load the model, open the store, prepare tables, seed, build the router.

use crate::config::{load_from_dir, resolve, ResolvedModel};
use crate::error::AppError;
use crate::routes::build_router;
use crate::seed::load_seed_file;
use crate::settings::{Settings, StoreBackend};
use crate::state::AppState;
use crate::store::{ensure_database_exists, EntityStore, MemoryStore, PgStore};
use axum::Router;
use std::path::Path;
use std::sync::Arc;

/// Read and validate the model files under `dir`.
pub async fn load_model(dir: impl AsRef<Path>) -> Result<ResolvedModel, AppError> {
    let config = load_from_dir(dir).await?;
    let model = resolve(&config)?;
    tracing::info!(
        entities = model.entities.len(),
        resources = model.resources.len(),
        "model loaded"
    );
    Ok(model)
}

/// Open the configured backend.
pub async fn connect_store(settings: &Settings) -> Result<Arc<dyn EntityStore>, AppError> {
    match settings.backend {
        StoreBackend::Memory => {
            tracing::info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            ensure_database_exists(&settings.database_url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(settings.db_max_connections)
                .connect(&settings.database_url)
                .await?;
            tracing::info!(max_connections = settings.db_max_connections, "connected to postgres");
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

/// Prepare storage, apply the seed script and return the router.
pub async fn init_app(
    store: Arc<dyn EntityStore>,
    model: ResolvedModel,
    settings: &Settings,
) -> Result<Router, AppError> {
    store.prepare(&model.entities, settings.schema_generation).await?;
    load_seed_file(store.as_ref(), &model, &settings.seed_path, settings.seed_path_explicit).await?;
    let state = AppState::new(store, model, settings.root_path.clone());
    Ok(build_router(state, settings.body_limit_bytes))
}

/// Everything `main` needs: model, store, router.
pub async fn bootstrap(settings: &Settings) -> Result<Router, AppError> {
    let model = load_model(&settings.config_path).await?;
    let store = connect_store(settings).await?;
    init_app(store, model, settings).await
}
