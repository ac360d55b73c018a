use axum::extract::State;
use axum::http::{header, Method};
use axum::response::IntoResponse;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod config;
mod database;
mod engine;
mod errors;
mod models;
mod services;
mod state;

use config::{AppConfig, EnvSecrets};
use database::connection::get_db_client;
use engine::dispatcher::NotificationDispatcher;
use engine::scheduler::{PollingScheduler, SchedulerDeps};
use services::feed_client::ApiFootballClient;
use services::match_state_store::MongoMatchStateStore;
use services::metadata_lookup::MongoMetadataLookup;
use services::push_service::WebPushChannel;
use services::subscriber_directory::MongoSubscriberDirectory;
use state::AppState;

const SERVICE_WORKER_JS: &str = include_str!("../static/push-sw.js");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("live_alerts=info,tower_http=info")),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!("🔧 Loaded config: {}", config.describe());

    let db = get_db_client(&config).await?;
    let scheduler = Arc::new(build_scheduler(&db, &config)?);

    if config.run_once {
        tracing::info!("Running a single polling cycle (RUN_ONCE=true)");
        let outcome = scheduler.run_once().await?;
        tracing::info!("One-shot cycle finished: {}", serde_json::to_string(&outcome)?);
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let poller = {
        let scheduler = scheduler.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    };

    let app_state = AppState::new(db, config.clone(), scheduler.status_handle());
    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 Health server listening on {}", addr);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down...");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    if let Err(e) = poller.await {
        tracing::error!("Polling task ended abnormally: {}", e);
    }

    Ok(())
}

fn build_scheduler(db: &mongodb::Database, config: &AppConfig) -> errors::Result<PollingScheduler> {
    let push_channel = Arc::new(WebPushChannel::new()?);
    let dispatcher = NotificationDispatcher::new(
        push_channel,
        config.site_base_url.clone(),
        config.push_concurrency,
    );

    let states = MongoMatchStateStore::new(db);
    let index_store = states.clone();
    tokio::spawn(async move {
        if let Err(e) = index_store.ensure_indexes().await {
            tracing::warn!("Failed to ensure match_states indexes: {}", e);
        }
    });

    let deps = SchedulerDeps {
        secrets: Arc::new(EnvSecrets),
        feed: Arc::new(ApiFootballClient::new(config.feed_base_url.clone())?),
        states: Arc::new(states),
        metadata: Arc::new(MongoMetadataLookup::new(db)),
        directory: Arc::new(MongoSubscriberDirectory::new(db)),
    };

    Ok(PollingScheduler::new(deps, dispatcher, config.poll_interval)
        .with_shutdown_grace(config.shutdown_grace))
}

fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/api/health", get(api_health_check))
        .route("/push-sw.js", get(service_worker))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn root_handler() -> &'static str {
    "⚽ Live match alerts"
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn api_health_check(State(state): State<AppState>) -> Json<Value> {
    use mongodb::bson::doc;

    let db_status = match state.db.run_command(doc! {"ping": 1}).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let scheduler = state.scheduler.read().await.clone();
    let status = if db_status == "connected" && scheduler.consecutive_failures < 5 {
        "healthy"
    } else {
        "degraded"
    };

    Json(json!({
        "status": status,
        "database": db_status,
        "scheduler": scheduler,
        "poll_interval_secs": state.config.poll_interval.as_secs(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn service_worker() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        SERVICE_WORKER_JS,
    )
}
