use server::app;
use server::config;
use server::state::AppState;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env();
    if config.gemini_api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set - coach and voice requests will fail");
    }

    let state = AppState::from_config(config.clone());
    app::spawn_puzzle_fetch(state.clone());

    let router = app::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
