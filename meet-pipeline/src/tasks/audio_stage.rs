//! Padding (C2), mixdown (C3), and waveform extraction (C4): the DSP leg of
//! the pipeline. Each stage persists its derived object under the
//! transcript's storage namespace (§6) and hands the next stage a presigned
//! URL rather than bytes.

use async_trait::async_trait;
use meet_orchestrator::{ForkGenerator, ForkPlan, TaskContext, TaskError, TaskHandler, TaskOutput};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::intake::RecordingInfo;
use super::{db_conn, db_err, load_fork_outputs, load_sibling_output, run_uuid, to_output, WorkflowInput};
use crate::ctx::{PipelineCtx, PRESIGN_TTL_SECS};

#[derive(Debug, Serialize, Deserialize)]
struct PadTrackInput {
    track_index: usize,
    object_key: String,
    source_url: String,
    transcript_id: Uuid,
}

pub struct PadTrackGenerator {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl ForkGenerator for PadTrackGenerator {
    fn task_name(&self) -> &str {
        "pad_track"
    }

    async fn generate(&self, ctx: &TaskContext) -> Result<ForkPlan, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = run_uuid(ctx)?;
        let recording: RecordingInfo = load_sibling_output(&self.ctx.pool, run_id, "get_recording")?;

        let mut task_refs = Vec::with_capacity(recording.track_keys.len());
        let mut inputs = Vec::with_capacity(recording.track_keys.len());

        for (i, key) in recording.track_keys.iter().enumerate() {
            let source_url = self
                .ctx
                .storage
                .presigned_url(&recording.bucket, key, PRESIGN_TTL_SECS)
                .await
                .map_err(TaskError::Transient)?;

            task_refs.push(format!("pad_track[{i}]"));
            inputs.push(
                to_output(PadTrackInput {
                    track_index: i,
                    object_key: key.clone(),
                    source_url,
                    transcript_id: input.transcript_id,
                })?,
            );
        }

        Ok(ForkPlan { task_refs, child_task_name: "pad_track".to_string(), inputs })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PadTrackOutput {
    pub track_index: usize,
    pub url: String,
    pub passthrough: bool,
}

pub struct PadTrackTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for PadTrackTask {
    fn task_name(&self) -> &str {
        "pad_track"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: PadTrackInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let padded = self.ctx.audio.pad_track(&input.source_url).await?;

        let url = if padded.passthrough {
            self.ctx
                .storage
                .presigned_url(&self.ctx.recording_bucket, &input.object_key, PRESIGN_TTL_SECS)
                .await
                .map_err(TaskError::Transient)?
        } else {
            let key = format!("{}/tracks/padded_{}.wav", input.transcript_id, input.track_index);
            self.ctx
                .storage
                .put(&self.ctx.derived_bucket, &key, padded.bytes, "audio/wav")
                .await
                .map_err(TaskError::Transient)?;
            self.ctx
                .storage
                .presigned_url(&self.ctx.derived_bucket, &key, PRESIGN_TTL_SECS)
                .await
                .map_err(TaskError::Transient)?
        };

        to_output(PadTrackOutput { track_index: input.track_index, url, passthrough: padded.passthrough })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MixdownOutputInfo {
    pub url: String,
    pub duration_ms: u64,
}

pub struct MixdownTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for MixdownTask {
    fn task_name(&self) -> &str {
        "mixdown"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = run_uuid(ctx)?;

        let mut tracks: Vec<PadTrackOutput> = load_fork_outputs(&self.ctx.pool, run_id, "pad_track")?;
        tracks.sort_by_key(|t| t.track_index);
        let urls: Vec<String> = tracks.into_iter().map(|t| t.url).collect();

        let (bytes, mixdown) = self.ctx.audio.mixdown(&urls).await?;

        let key = format!("{}/audio.wav", input.transcript_id);
        self.ctx
            .storage
            .put(&self.ctx.derived_bucket, &key, bytes, "audio/wav")
            .await
            .map_err(TaskError::Transient)?;
        let url = self
            .ctx
            .storage
            .presigned_url(&self.ctx.derived_bucket, &key, PRESIGN_TTL_SECS)
            .await
            .map_err(TaskError::Transient)?;

        let mut conn = db_conn(&self.ctx.pool)?;
        let duration_secs = mixdown.duration_ms as f64 / 1000.0;
        meet_storage::controllers::transcripts::update_duration(&mut conn, input.transcript_id, duration_secs)
            .map_err(db_err)?;
        super::append_event(&mut conn, input.transcript_id, meet_shared::EventKind::Duration { duration: duration_secs });

        to_output(MixdownOutputInfo { url, duration_ms: mixdown.duration_ms })
    }
}

pub struct WaveformTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for WaveformTask {
    fn task_name(&self) -> &str {
        "waveform"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = run_uuid(ctx)?;
        let mixdown: MixdownOutputInfo = load_sibling_output(&self.ctx.pool, run_id, "mixdown")?;

        const BUCKETS: usize = 255;
        let peaks = self.ctx.audio.waveform(&mixdown.url, BUCKETS).await?;

        let waveform_key = format!("{}/waveform.json", input.transcript_id);
        let body = serde_json::to_vec(&peaks).map_err(|e| TaskError::Permanent(e.to_string()))?;
        self.ctx
            .storage
            .put(&self.ctx.derived_bucket, &waveform_key, body, "application/json")
            .await
            .map_err(TaskError::Transient)?;

        let mut conn = db_conn(&self.ctx.pool)?;
        meet_storage::controllers::transcripts::update_waveform(&mut conn, input.transcript_id, &peaks).map_err(db_err)?;
        super::append_event(&mut conn, input.transcript_id, meet_shared::EventKind::Waveform { peaks: peaks.clone() });

        to_output(serde_json::json!({ "peaks": peaks }))
    }
}
