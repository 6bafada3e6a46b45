use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Shared secret the recording platform signs its webhook bodies with.
    #[serde(default = "default_webhook_secret")]
    pub webhook_shared_secret: String,
    #[serde(default = "default_webhook_max_age_secs")]
    pub webhook_max_age_secs: u64,

    #[serde(default = "default_recording_bucket")]
    pub recording_bucket: String,
}

fn default_port() -> u16 {
    8000
}
fn default_database_url() -> String {
    "postgres://localhost/meet".into()
}
fn default_redis_url() -> String {
    "redis://localhost:6379".into()
}
fn default_webhook_secret() -> String {
    "development-secret-change-in-production".into()
}
fn default_webhook_max_age_secs() -> u64 {
    300
}
fn default_recording_bucket() -> String {
    "recordings".into()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MEET_API").separator("__"))
            .build()?;
        Ok(config.try_deserialize().unwrap_or_else(|_| Self {
            port: default_port(),
            database_url: default_database_url(),
            redis_url: default_redis_url(),
            webhook_shared_secret: default_webhook_secret(),
            webhook_max_age_secs: default_webhook_max_age_secs(),
            recording_bucket: default_recording_bucket(),
        }))
    }
}
