use anyhow::Context;
use dotenvy::dotenv;

use spay::logging::init_tracing;
use spay::router::init_router;
use spay::spay_config::ServerConfig;
use spay::state::init_app_state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let server = ServerConfig::from_env();
    init_tracing(&server.log_dir).context("failed to initialize logging")?;

    let state = init_app_state().await?;
    let app = init_router(state);

    let address = server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!(%address, "Server running");
    tracing::info!("Swagger UI available at http://{address}/swagger-ui");
    tracing::info!("Scalar UI available at http://{address}/scalar");

    axum::serve(listener, app).await?;
    Ok(())
}
