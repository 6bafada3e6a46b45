mod config;
mod daily;
mod routes;
mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use meet_orchestrator::{Engine, Registry};
use meet_shared::clients::{create_pool, RedisClient};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    meet_shared::middleware::init_tracing("meet-api");
    let metrics_handle = meet_shared::middleware::init_metrics();

    let config = AppConfig::load()?;
    let pool = create_pool(&config.database_url);
    let redis = RedisClient::connect(&config.redis_url).await?;

    // meet-api only ever calls `start`/`get_status`/`cancel`/`replay`, none
    // of which touch the task registry, so it runs with no handlers bound.
    let engine = Arc::new(Engine::new(pool.clone(), Registry::new()).with_redis(redis.clone()));

    let state = AppState { pool, redis, engine, config: Arc::new(config) };
    let addr = format!("0.0.0.0:{}", state.config.port);

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(move || async move { metrics_handle.render() }))
        .route("/v1/webhook/daily", post(routes::webhook::daily_webhook))
        .route("/v1/transcripts/:id/ws", get(routes::ws::transcript_ws))
        .route("/v1/events", get(routes::ws::user_events))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "meet-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
