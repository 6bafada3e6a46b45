//! Concrete task handlers and fork generators for the multitrack
//! post-processing DAG (§4.11), grouped by the pipeline stage they belong
//! to. Every handler/generator here is registered under its `task_name` in
//! `workflow.rs`'s `Registry`.

mod audio_stage;
mod intake;
mod notify_stage;
mod summarize_stage;
mod topics_stage;
mod transcribe_stage;

pub use audio_stage::{MixdownTask, PadTrackGenerator, PadTrackTask, WaveformTask};
pub use intake::{GetParticipantsTask, GetRecordingTask};
pub use notify_stage::{ChatPostTask, ConsentCleanupTask, WebhookTask};
pub use summarize_stage::{FinalizeTask, LongSummaryTask, ShortSummaryTask, TitleTask};
pub use topics_stage::{AggregateTopicsTask, DetectTopicsTask, TopicSummaryGenerator, TopicSummaryTask};
pub use transcribe_stage::{MergeWordsTask, TranscribeTrackGenerator, TranscribeTrackTask};

use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::PgConnection;
use meet_orchestrator::{TaskContext, TaskError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The root input every static DAG node receives (§4.11's payload-thinning
/// rule): two identifiers, with everything else reloaded from storage by
/// whichever task needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInput {
    pub transcript_id: Uuid,
    pub recording_id: Uuid,
}

pub(crate) fn run_uuid(ctx: &TaskContext) -> Result<Uuid, TaskError> {
    Uuid::parse_str(&ctx.run_id).map_err(|e| TaskError::Permanent(format!("invalid run id: {e}")))
}

pub(crate) fn db_conn(
    pool: &meet_shared::clients::DbPool,
) -> Result<PooledConnection<ConnectionManager<PgConnection>>, TaskError> {
    pool.get().map_err(|e| TaskError::Transient(format!("db pool exhausted: {e}")))
}

pub(crate) fn load_sibling_output<T: serde::de::DeserializeOwned>(
    pool: &meet_shared::clients::DbPool,
    run_id: Uuid,
    task_ref: &str,
) -> Result<T, TaskError> {
    let value = meet_orchestrator::store::task_output(pool, run_id, task_ref)
        .map_err(|e| TaskError::Transient(e.to_string()))?
        .ok_or_else(|| TaskError::Permanent(format!("{task_ref} has no output yet")))?;
    serde_json::from_value(value).map_err(|e| TaskError::Permanent(format!("malformed {task_ref} output: {e}")))
}

pub(crate) fn load_fork_outputs<T: serde::de::DeserializeOwned>(
    pool: &meet_shared::clients::DbPool,
    run_id: Uuid,
    generator_ref: &str,
) -> Result<Vec<T>, TaskError> {
    let values = meet_orchestrator::store::fork_outputs(pool, run_id, generator_ref)
        .map_err(|e| TaskError::Transient(e.to_string()))?;
    values
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(|e| TaskError::Permanent(format!("malformed {generator_ref} child output: {e}"))))
        .collect()
}

pub(crate) fn append_event(
    conn: &mut diesel::PgConnection,
    transcript_id: Uuid,
    kind: meet_shared::EventKind,
) {
    let event = meet_shared::TranscriptEvent::new(transcript_id, kind);
    if let Err(err) = meet_storage::controllers::transcripts::append_event(conn, transcript_id, &event) {
        tracing::warn!(transcript_id = %transcript_id, error = %err, "failed to append transcript event");
    }
}

pub(crate) fn to_output(value: impl Serialize) -> Result<meet_orchestrator::TaskOutput, TaskError> {
    serde_json::to_value(value).map_err(|e| TaskError::Permanent(e.to_string()))
}

/// `meet_shared::AppError` (diesel/db failures) is treated as transient: a
/// dropped connection or lock timeout is worth the orchestrator's retry.
pub(crate) fn db_err(err: meet_shared::AppError) -> TaskError {
    TaskError::Transient(err.to_string())
}
