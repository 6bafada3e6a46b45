//! Notification dispatcher (C10): consent cleanup, chat post, and the
//! outgoing webhook, each an independent task running after `finalize`.

use async_trait::async_trait;
use meet_orchestrator::{TaskContext, TaskError, TaskHandler, TaskOutput};
use meet_shared::WebhookPayload;

use super::intake::{ParticipantsInfo, RecordingInfo};
use super::{db_conn, db_err, load_sibling_output, to_output, WorkflowInput};
use crate::ctx::PipelineCtx;
use crate::notify::consent::{any_consent_denied, delete_mix_object};
use crate::notify::webhook::deliver_webhook;

pub struct ConsentCleanupTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for ConsentCleanupTask {
    fn task_name(&self) -> &str {
        "consent_cleanup"
    }

    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;
        let run_id = super::run_uuid(ctx)?;
        let recording: RecordingInfo = load_sibling_output(&self.ctx.pool, run_id, "get_recording")?;

        let mut conn = db_conn(&self.ctx.pool)?;
        let denied = match recording.meeting_id {
            Some(meeting_id) => meet_storage::controllers::consent::any_denied(&mut conn, meeting_id).map_err(db_err)?,
            None => {
                let participants: ParticipantsInfo = load_sibling_output(&self.ctx.pool, run_id, "get_participants")?;
                any_consent_denied(&participants.participants)
            }
        };

        if denied {
            let key = format!("{}/audio.wav", input.transcript_id);
            delete_mix_object(&self.ctx.storage, &self.ctx.derived_bucket, &key).await?;
            meet_storage::controllers::transcripts::set_audio_deleted(&mut conn, input.transcript_id).map_err(db_err)?;
        }

        to_output(serde_json::json!({ "audio_deleted": denied }))
    }
}

pub struct ChatPostTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for ChatPostTask {
    fn task_name(&self) -> &str {
        "chat_post"
    }

    /// A missing chat client is the "no integration configured" case (§4.10
    /// step 2): skip silently rather than fail the task.
    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;

        let Some(chat) = self.ctx.chat.as_ref() else {
            return to_output(serde_json::json!({ "posted": false }));
        };

        let mut conn = db_conn(&self.ctx.pool)?;
        let transcript = meet_storage::controllers::transcripts::get(&mut conn, input.transcript_id).map_err(db_err)?;
        let room = meet_storage::controllers::rooms::get(&mut conn, transcript.room_id).map_err(db_err)?;

        let message_id = chat.post(&room.name, &transcript.title, &transcript.short_summary).await?;
        meet_storage::controllers::transcripts::set_zulip_message_id(&mut conn, input.transcript_id, message_id.clone())
            .map_err(db_err)?;

        to_output(serde_json::json!({ "posted": true, "message_id": message_id }))
    }
}

pub struct WebhookTask {
    pub ctx: PipelineCtx,
}

#[async_trait]
impl TaskHandler for WebhookTask {
    fn task_name(&self) -> &str {
        "webhook"
    }

    /// A missing `webhook_url`/`webhook_secret` pair is the "no webhook
    /// configured" case (§4.10 step 3): skip silently.
    async fn run(&self, ctx: &TaskContext) -> Result<TaskOutput, TaskError> {
        let input: WorkflowInput = ctx.input_as().map_err(|e| TaskError::Permanent(e.to_string()))?;

        let mut conn = db_conn(&self.ctx.pool)?;
        let transcript = meet_storage::controllers::transcripts::get(&mut conn, input.transcript_id).map_err(db_err)?;
        let Some((url, secret)) = meet_storage::controllers::rooms::webhook_config(&mut conn, transcript.room_id)
            .map_err(db_err)?
        else {
            return to_output(serde_json::json!({ "delivered": false }));
        };
        let room = meet_storage::controllers::rooms::get(&mut conn, transcript.room_id).map_err(db_err)?;
        drop(conn);

        let topics = transcript.topics();
        let participants = transcript.participants();
        let topic_payloads = topics
            .iter()
            .map(|t| {
                let vtt = meet_storage::webvtt::render(std::slice::from_ref(t), &participants);
                meet_shared::WebhookTopicPayload::from_topic(t, vtt)
            })
            .collect();
        let participant_payloads = participants.iter().map(meet_shared::WebhookParticipantPayload::from).collect();

        let payload = WebhookPayload {
            transcript: meet_shared::WebhookTranscriptPayload {
                id: transcript.id,
                status: transcript.status(),
                title: transcript.title.clone(),
                short_summary: transcript.short_summary.clone(),
                long_summary: transcript.long_summary.clone(),
                duration: transcript.duration,
                topics: topic_payloads,
                participants: participant_payloads,
                created_at: transcript.created_at,
            },
            room: Some(meet_shared::WebhookRoomPayload { id: room.id, name: room.name }),
            calendar_event: None,
            frontend_url: format!("{}/transcripts/{}", self.ctx.frontend_base_url.trim_end_matches('/'), transcript.id),
        };

        deliver_webhook(&self.ctx.http, &url, &secret, &payload, ctx.attempt).await?;
        to_output(serde_json::json!({ "delivered": true }))
    }
}
