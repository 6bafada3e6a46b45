mod config;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use diesel::prelude::*;
use meet_orchestrator::schema::workflow_run::dsl as wr;
use meet_orchestrator::{Engine, RunStatus, WorkflowRunRow};
use meet_pipeline::audio::{AudioBackend, LocalAudioBackend, RemoteAudioBackend};
use meet_pipeline::asr::HttpAsrClient;
use meet_pipeline::llm::HttpLlmClient;
use meet_pipeline::notify::HttpChatClient;
use meet_pipeline::workflow::{build_registry, multitrack_dag};
use meet_pipeline::PipelineCtx;
use meet_shared::clients::{create_pool, DbPool, RedisClient, StorageClient};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::AppConfig;

/// Tracks which workflow runs this process already has an `engine.run()`
/// task in flight for, so the poll loop never double-dispatches the same run.
#[derive(Default)]
struct ActiveRuns(Mutex<HashSet<uuid::Uuid>>);

impl ActiveRuns {
    async fn try_claim(&self, run_id: uuid::Uuid) -> bool {
        self.0.lock().await.insert(run_id)
    }

    async fn release(&self, run_id: uuid::Uuid) {
        self.0.lock().await.remove(&run_id);
    }
}

fn pending_runs(pool: &DbPool) -> Vec<WorkflowRunRow> {
    let mut conn = match pool.get() {
        Ok(conn) => conn,
        Err(e) => {
            error!(error = %e, "failed to check out db connection for run poll");
            return Vec::new();
        }
    };

    wr::workflow_run
        .filter(wr::status.eq(RunStatus::Running.as_str()))
        .load::<WorkflowRunRow>(&mut conn)
        .unwrap_or_else(|e| {
            error!(error = %e, "failed to query pending workflow runs");
            Vec::new()
        })
}

/// Scans `workflow_run` for rows in `running` status not already being
/// driven in-process and spawns `engine.run()` for each. Runs that are
/// mid-dispatch elsewhere are skipped via `active`; a run whose task
/// instances are all already terminal is a cheap no-op inside `engine.run`.
fn spawn_poll_loop(
    engine: Arc<Engine>,
    pool: DbPool,
    active: Arc<ActiveRuns>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "workflow run poller started");
        let dag = multitrack_dag();
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            let runs = tokio::task::spawn_blocking({
                let pool = pool.clone();
                move || pending_runs(&pool)
            })
            .await
            .unwrap_or_default();

            for run in runs {
                if !active.try_claim(run.id).await {
                    continue;
                }

                let engine = engine.clone();
                let active = active.clone();
                let dag = dag.clone();

                tokio::spawn(async move {
                    match engine.run(&dag, run.id).await {
                        Ok(status) => info!(run_id = %run.id, ?status, "workflow run finished"),
                        Err(e) => warn!(run_id = %run.id, error = %e, "workflow run ended with an error"),
                    }
                    active.release(run.id).await;
                });
            }
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    meet_shared::middleware::init_tracing("meet-worker");

    let cfg = AppConfig::load()?;

    let pool = create_pool(&cfg.database_url);
    let redis = RedisClient::connect(&cfg.redis_url).await?;
    let storage = StorageClient::new(
        &cfg.storage_endpoint,
        &cfg.storage_access_key,
        &cfg.storage_secret_key,
        &cfg.recording_bucket,
        &cfg.storage_public_url,
    )
    .await;

    let audio: Arc<dyn AudioBackend> = match &cfg.audio_backend_url {
        Some(url) => Arc::new(RemoteAudioBackend::new(url.clone())),
        None => Arc::new(LocalAudioBackend::new()),
    };

    let chat = match (&cfg.chat_base_url, &cfg.chat_api_key) {
        (Some(base), Some(key)) => {
            Some(Arc::new(HttpChatClient::new(base.clone(), key.clone())) as Arc<dyn meet_pipeline::notify::ChatClient>)
        }
        _ => None,
    };

    let ctx = PipelineCtx {
        pool: pool.clone(),
        storage,
        audio,
        asr: Arc::new(HttpAsrClient::new(cfg.asr_base_url.clone())),
        llm: Arc::new(HttpLlmClient::new(cfg.llm_base_url.clone())),
        chat,
        http: reqwest::Client::new(),
        frontend_base_url: cfg.frontend_base_url.clone(),
        recording_bucket: cfg.recording_bucket.clone(),
        derived_bucket: cfg.derived_bucket.clone(),
    };

    let registry = build_registry(ctx);
    let engine = Arc::new(Engine::new(pool.clone(), registry).with_redis(redis).with_concurrency(cfg.concurrency));

    let active = Arc::new(ActiveRuns::default());
    let poller = spawn_poll_loop(engine, pool, active, Duration::from_secs(cfg.poll_interval_secs));

    if let Err(e) = poller.await {
        error!(error = %e, "workflow run poller task panicked");
    }

    Ok(())
}
