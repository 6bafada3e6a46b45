use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use meet_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_check = {
        let pool = state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| e.to_string())?;
            diesel::sql_query("SELECT 1").execute(&mut conn).map_err(|e| e.to_string())
        })
        .await
    };

    let db = match db_check {
        Ok(Ok(_)) => HealthCheck { name: "database".into(), status: HealthStatus::Healthy, message: None },
        Ok(Err(e)) => HealthCheck { name: "database".into(), status: HealthStatus::Unhealthy, message: Some(e) },
        Err(e) => HealthCheck { name: "database".into(), status: HealthStatus::Unhealthy, message: Some(e.to_string()) },
    };

    let redis = match state.redis.exists("health-check-probe").await {
        Ok(_) => HealthCheck { name: "redis".into(), status: HealthStatus::Healthy, message: None },
        Err(e) => HealthCheck { name: "redis".into(), status: HealthStatus::Degraded, message: Some(e.to_string()) },
    };

    Json(HealthResponse::healthy("meet-api", env!("CARGO_PKG_VERSION")).with_checks(vec![db, redis]))
}
