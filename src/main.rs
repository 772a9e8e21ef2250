mod app;
mod attendance;
mod auth;
mod config;
mod db;
mod error;
mod images;
mod posts;
mod state;
mod storage;
mod users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "attendance=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;
    tracing::info!(
        jwt_issuer = %app_state.config.jwt.issuer,
        token_ttl_secs = app_state.auth.keys().default_ttl().as_secs(),
        image_upload = app_state.storage.is_some(),
        "configuration loaded"
    );

    app::serve(app::build_app(app_state)).await
}
