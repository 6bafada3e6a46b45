//! Shared dependencies every task handler/generator needs: a database pool
//! for reloading payload-thinned state, the object store, and the external
//! service clients. One instance is built at process startup (meet-worker's
//! `main.rs`) and cloned (cheaply, everything inside is `Arc`/pool-backed)
//! into each registered handler.

use std::sync::Arc;

use meet_shared::clients::{DbPool, StorageClient};

use crate::asr::AsrClient;
use crate::audio::AudioBackend;
use crate::llm::LlmClient;
use crate::notify::ChatClient;

/// Presign TTL used for URLs handed to downstream tasks (§4.1: "typically 2
/// hours for mixdown/transcribe").
pub const PRESIGN_TTL_SECS: u64 = 7200;

#[derive(Clone)]
pub struct PipelineCtx {
    pub pool: DbPool,
    pub storage: StorageClient,
    pub audio: Arc<dyn AudioBackend>,
    pub asr: Arc<dyn AsrClient>,
    pub llm: Arc<dyn LlmClient>,
    pub chat: Option<Arc<dyn ChatClient>>,
    pub http: reqwest::Client,
    pub frontend_base_url: String,
    pub recording_bucket: String,
    pub derived_bucket: String,
}
