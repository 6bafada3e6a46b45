use std::sync::Arc;

use meet_orchestrator::Engine;
use meet_shared::clients::{DbPool, RedisClient};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub redis: RedisClient,
    pub engine: Arc<Engine>,
    pub config: Arc<AppConfig>,
}
