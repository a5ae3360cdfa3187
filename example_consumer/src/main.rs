//! Example consumer: a separate Rust project that uses rest-data as a dependency.
//! The model is declared in code and served from the in-memory store.
//!
//! Run from repo root: `cargo run -p example-consumer`

use rest_data::{
    config::{EntityConfig, FieldConfig, FieldType, ResourceConfig},
    init_app, resolve, FullConfig, MemoryStore, Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;

fn model() -> FullConfig {
    let mut title = FieldConfig::new("title", FieldType::String);
    title.nullable = false;
    title.max_length = Some(200);

    // "TodoItemController" is served at /todo-item
    let mut resource = ResourceConfig::new("TodoItemController", "todo_item");
    resource.paged = true;
    resource.hal = true;
    resource.methods.delete.exposed = false;

    FullConfig {
        entities: vec![EntityConfig {
            id: "todo_item".into(),
            name: "TodoItem".into(),
            schema: None,
            table: None,
            id_field: Default::default(),
            fields: vec![
                title,
                FieldConfig::new("done", FieldType::Boolean),
                FieldConfig::new("due", FieldType::Date),
            ],
        }],
        resources: vec![resource],
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rest_data=info")),
        )
        .init();

    let model = resolve(&model())?;
    let mut settings = Settings::in_memory("example_consumer");
    settings.root_path = "/api".into();
    let app = init_app(Arc::new(MemoryStore::new()), model, &settings).await?;

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    let port = listener.local_addr()?.port();
    tracing::info!("Example consumer listening on http://127.0.0.1:{}/api/todo-item", port);
    axum::serve(listener, app).await?;
    Ok(())
}
