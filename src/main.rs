use axum::extract::State;
use axum::{http::Method, response::Json, routing::get, Router};
use anyhow::Context;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod config;
mod database;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod test_support;

use config::AppConfig;
use database::connection::get_db_client;
use database::snapshot_store::{MongoSnapshotStore, SnapshotStore};
use services::orchestrator::{OrchestratorSettings, PredictionOrchestrator};
use services::push_service::{BroadcastHub, FanoutPublisher, PushPublisher, WebhookPublisher};
use services::result_cache::{InMemoryResultCache, RedisResultCache, ResultCache};
use services::snapshot_collector::SnapshotCollector;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let app_state = initialize_app_state(config).await?;

    let shutdown = CancellationToken::new();
    let scheduler = app_state
        .orchestrator
        .clone()
        .spawn_scheduler(app_state.config.processing_interval(), shutdown.clone());

    let app = build_router(app_state.clone());
    start_server(app, &app_state.config, shutdown.clone()).await?;

    shutdown.cancel();
    if let Err(e) = scheduler.await {
        tracing::error!("Prediction scheduler ended abnormally: {}", e);
    }
    let flushed = app_state.collector.flush_pending().await;
    tracing::info!("👋 Shutdown complete, flushed {} pending snapshots", flushed);
    Ok(())
}

async fn initialize_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let db = get_db_client(&config.database_url, &config.database_name)
        .await
        .context("failed to connect to MongoDB")?;

    let mongo_store = MongoSnapshotStore::new(&db);
    if let Err(e) = mongo_store.ensure_indexes(config.snapshot_retention()).await {
        tracing::warn!("⚠️ Could not ensure snapshot indexes: {}", e);
    }
    let store: Arc<dyn SnapshotStore> = Arc::new(mongo_store);

    let cache: Arc<dyn ResultCache> = match &config.redis_url {
        Some(url) => match RedisResultCache::connect(url).await {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                tracing::error!("❌ Failed to connect to Redis: {}", e);
                tracing::warn!("Falling back to in-process result cache");
                Arc::new(InMemoryResultCache::new())
            }
        },
        None => {
            tracing::info!("REDIS_URL not set, using in-process result cache");
            Arc::new(InMemoryResultCache::new())
        }
    };

    let hub = Arc::new(BroadcastHub::new());
    let mut targets: Vec<Arc<dyn PushPublisher>> = vec![hub.clone()];
    if let Some(url) = &config.push_webhook_url {
        tracing::info!("🔧 Webhook push target enabled");
        targets.push(Arc::new(WebhookPublisher::new(url.clone())));
    }
    let publisher: Arc<dyn PushPublisher> = Arc::new(FanoutPublisher::new(targets));

    let collector = Arc::new(SnapshotCollector::new(store.clone(), config.flush_batch_size));
    let orchestrator = Arc::new(PredictionOrchestrator::new(
        store,
        cache,
        publisher,
        OrchestratorSettings {
            chunk_size: config.processing_chunk_size,
            lookback: config.lookback(),
            cache_ttl: config.result_cache_ttl(),
        },
    ));

    tracing::info!("✅ Snapshot collector and prediction orchestrator initialized");
    Ok(AppState::new(config, collector, orchestrator, hub))
}

fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/api/health", get(api_health_check))
        .nest("/api/snapshots", routes::snapshots::routes())
        .nest("/api/predictions", routes::predictions::routes())
        .nest("/ws", routes::predictions::feed_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn start_server(app: Router, config: &AppConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let host: std::net::IpAddr = config
        .host
        .parse()
        .with_context(|| format!("invalid HOST '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);

    tracing::info!("🚀 Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for ctrl-c: {}", e);
            }
            tracing::info!("🛑 Shutdown signal received");
        }
        _ = shutdown.cancelled() => {}
    }
}

async fn root_handler() -> &'static str {
    "⚽ Match Insights API"
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn api_health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "config": state.config.summary(),
        "collector": state.collector.stats(),
        "live_subscribers": state.hub.subscriber_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
