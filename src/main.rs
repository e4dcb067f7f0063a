mod config;
mod counter;
mod db;
mod error;
mod landing;
mod proxy;
mod response;
#[cfg(test)]
mod test_support;

use axum::{
    Router,
    routing::{get, post},
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "counter_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!(
        "Starting counter proxy on port {} relaying to {}",
        config.port,
        config.siliconflow_url
    );
    if config.siliconflow_key.is_none() {
        tracing::warn!("SILICONFLOW_KEY is not set; /api/siliconflow will reject requests");
    }

    // Initialize database, making sure the file's directory exists
    let db_path = config
        .database_url
        .strip_prefix("sqlite:")
        .unwrap_or(&config.database_url);
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&format!("{}?mode=rwc", config.database_url))
        .await?;

    db::init_db(&db).await?;
    tracing::info!("Database initialized at {}", config.database_url);

    let state = Arc::new(proxy::AppState {
        config: config.clone(),
        db,
        client: proxy::create_client(),
    });

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("Listening on 0.0.0.0:{}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: Arc<proxy::AppState>) -> Router {
    Router::new()
        .route("/", get(landing::index))
        .route(
            "/api/count",
            get(counter::get_count).post(counter::update_count),
        )
        .route("/api/siliconflow", post(proxy::siliconflow_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
