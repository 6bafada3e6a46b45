//! `get_recording` and `get_participants`: the two tasks that seed the DAG
//! with everything downstream stages reload by identity.

use async_trait::async_trait;
use meet_orchestrator::{TaskContext, TaskError, TaskHandler, TaskOutput};
use meet_shared::{ConsentState, Participant};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{db_conn, db_err, load_sibling_output, to_output, WorkflowInput};
use crate::ctx::PipelineCtx;

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordingInfo {
    pub bucket: String,
    pub track_keys: Vec<String>,
    pub meeting_id: Option<Uuid>,
    pub source_language: String,
    pub target_language: String,
}

pub struct GetRecordingTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for GetRecordingTask {
    fn task_name(&self) -> &str {
        "get_recording"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let mut conn = db_conn(&self.ctx.pool)?;

        let recording = meet_storage::controllers::recordings::get(&mut conn, input.recording_id).map_err(db_err)?;
        let transcript = meet_storage::controllers::transcripts::get(&mut conn, input.transcript_id).map_err(db_err)?;

        let track_keys = if recording.is_multitrack() {
            recording.track_keys().unwrap_or_default()
        } else {
            recording
                .object_key
                .clone()
                .map(|k| vec![k])
                .ok_or_else(|| TaskError::Permanent("recording has neither track_keys nor object_key".into()))?
        };
        if track_keys.is_empty() {
            return Err(TaskError::Permanent("recording has no audio tracks".into()));
        }

        meet_storage::controllers::transcripts::set_status(
            &mut conn,
            input.transcript_id,
            "processing",
            Some(ctx.run_id.clone()),
        )
        .map_err(db_err)?;

        to_output(RecordingInfo {
            bucket: recording.bucket_name,
            track_keys,
            meeting_id: recording.meeting_id,
            source_language: transcript.source_language,
            target_language: transcript.target_language,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ParticipantsInfo {
    pub participants: Vec<Participant>,
}

pub struct GetParticipantsTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for GetParticipantsTask {
    fn task_name(&self) -> &str {
        "get_participants"
    }

    /// Multitrack recordings carry one audio track per participant, so a
    /// participant's `speaker` index is simply its track's position; names
    /// default to a generic label since the intake schema doesn't carry
    /// per-track attendee identity (that lives, if anywhere, upstream of
    /// this system in the video platform's own roster).
    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = super::run_uuid(ctx)?;
        let recording: RecordingInfo = load_sibling_output(&self.ctx.pool, run_id, "get_recording")?;

        let participants: Vec<Participant> = recording
            .track_keys
            .iter()
            .enumerate()
            .map(|(i, _)| Participant {
                id: Uuid::now_v7(),
                speaker: Some(i as i32),
                name: format!("Speaker {}", i + 1),
                consent: Some(ConsentState::Unknown),
            })
            .collect();

        let mut conn = db_conn(&self.ctx.pool)?;
        meet_storage::controllers::transcripts::update_participants(&mut conn, input.transcript_id, &participants)
            .map_err(db_err)?;
        super::append_event(
            &mut conn,
            input.transcript_id,
            meet_shared::EventKind::Participants { participants: participants.clone() },
        );

        to_output(ParticipantsInfo { participants })
    }
}
