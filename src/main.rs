//! Server: reads settings from the environment, loads the model from CONFIG_PATH and serves the generated resources.

use rest_data::{bootstrap, Settings};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rest_data=info".parse()?))
        .init();

    let app = bootstrap(&settings).await?;

    let listener = TcpListener::bind(settings.address()).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        root_path = %settings.root_path,
        "listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
