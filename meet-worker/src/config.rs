use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    #[serde(default = "default_storage_endpoint")]
    pub storage_endpoint: String,
    #[serde(default = "default_storage_access_key")]
    pub storage_access_key: String,
    #[serde(default = "default_storage_secret_key")]
    pub storage_secret_key: String,
    #[serde(default = "default_storage_public_url")]
    pub storage_public_url: String,
    #[serde(default = "default_recording_bucket")]
    pub recording_bucket: String,
    #[serde(default = "default_derived_bucket")]
    pub derived_bucket: String,

    #[serde(default = "default_asr_base_url")]
    pub asr_base_url: String,
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,
    pub chat_base_url: Option<String>,
    pub chat_api_key: Option<String>,
    pub audio_backend_url: Option<String>,

    #[serde(default = "default_frontend_base_url")]
    pub frontend_base_url: String,

    /// How many workflow runs this process drives concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// How often to scan `workflow_run` for rows not yet being driven.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_database_url() -> String {
    "postgres://localhost/meet".into()
}
fn default_redis_url() -> String {
    "redis://localhost:6379".into()
}
fn default_storage_endpoint() -> String {
    "http://localhost:9000".into()
}
fn default_storage_access_key() -> String {
    "minioadmin".into()
}
fn default_storage_secret_key() -> String {
    "minioadmin".into()
}
fn default_storage_public_url() -> String {
    "http://localhost:9000".into()
}
fn default_recording_bucket() -> String {
    "recordings".into()
}
fn default_derived_bucket() -> String {
    "derived".into()
}
fn default_asr_base_url() -> String {
    "http://localhost:8100".into()
}
fn default_llm_base_url() -> String {
    "http://localhost:8200".into()
}
fn default_frontend_base_url() -> String {
    "http://localhost:3000".into()
}
fn default_concurrency() -> usize {
    8
}
fn default_poll_interval_secs() -> u64 {
    5
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MEET_WORKER").separator("__"))
            .build()?;
        Ok(config.try_deserialize().unwrap_or_else(|_| Self {
            database_url: default_database_url(),
            redis_url: default_redis_url(),
            storage_endpoint: default_storage_endpoint(),
            storage_access_key: default_storage_access_key(),
            storage_secret_key: default_storage_secret_key(),
            storage_public_url: default_storage_public_url(),
            recording_bucket: default_recording_bucket(),
            derived_bucket: default_derived_bucket(),
            asr_base_url: default_asr_base_url(),
            llm_base_url: default_llm_base_url(),
            chat_base_url: None,
            chat_api_key: None,
            audio_backend_url: None,
            frontend_base_url: default_frontend_base_url(),
            concurrency: default_concurrency(),
            poll_interval_secs: default_poll_interval_secs(),
        }))
    }
}
