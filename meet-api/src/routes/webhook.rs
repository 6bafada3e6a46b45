use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use meet_pipeline::tasks::WorkflowInput;
use meet_pipeline::workflow::multitrack_dag;
use meet_shared::middleware::verify_inbound as verify_webhook_signature;
use meet_storage::controllers::{meetings, recordings, transcripts};
use meet_storage::models::RecordingStatus;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::daily::WebhookEvent;
use crate::state::AppState;

/// `POST /v1/webhook/daily`. Verifies the recording platform's HMAC
/// signature, dispatches on event type, and on `recording.ready-to-download`
/// creates the transcript row and starts the workflow run (§4.12).
pub async fn daily_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<Value>, meet_shared::AppError> {
    let signature = headers
        .get("X-Webhook-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| meet_shared::AppError::unauthorized("missing X-Webhook-Signature header"))?;
    let timestamp = headers
        .get("X-Webhook-Timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| meet_shared::AppError::unauthorized("missing X-Webhook-Timestamp header"))?;

    let now = chrono::Utc::now().timestamp() as u64;
    verify_webhook_signature(&state.config.webhook_shared_secret, signature, timestamp, &body, now, state.config.webhook_max_age_secs)
        .map_err(|e| meet_shared::AppError::unauthorized(format!("signature verification failed: {e}")))?;

    if body.as_ref() == br#"{"test":"test"}"# {
        return Ok(Json(json!({"status": "ok"})));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| meet_shared::AppError::bad_request(format!("invalid event format: {e}")))?;

    match event {
        WebhookEvent::ParticipantJoined { payload } => {
            info!(room_name = ?payload.room_name, user_id = ?payload.user_id, "participant joined");
        }
        WebhookEvent::ParticipantLeft { payload } => {
            info!(room_name = ?payload.room_name, user_id = ?payload.user_id, "participant left");
        }
        WebhookEvent::RecordingStarted { payload } => {
            info!(recording_id = %payload.recording_id, room_name = ?payload.room_name, "recording started");
        }
        WebhookEvent::RecordingError { payload } => {
            warn!(recording_id = ?payload.recording_id, error = ?payload.error_msg, "recording error");
        }
        WebhookEvent::RecordingReady { payload } => handle_recording_ready(&state, payload).await?,
    }

    Ok(Json(json!({"status": "ok"})))
}

async fn handle_recording_ready(
    state: &AppState,
    payload: crate::daily::RecordingReadyPayload,
) -> Result<(), meet_shared::AppError> {
    let track_keys = payload.audio_track_keys();
    if track_keys.is_empty() {
        warn!(recording_id = %payload.recording_id, "recording.ready-to-download with no audio tracks, skipping");
        return Ok(());
    }

    let pool = state.pool.clone();
    let recording_id = payload.recording_id.clone();
    let room_name = payload.room_name.clone();
    let bucket = state.config.recording_bucket.clone();

    let outcome = tokio::task::spawn_blocking(move || -> meet_shared::AppResult<Option<(uuid::Uuid, uuid::Uuid)>> {
        let mut conn = pool.get().map_err(|e| meet_shared::AppError::internal(e.to_string()))?;

        let meeting = match &room_name {
            Some(name) => meetings::find_by_room_name(&mut conn, name)?,
            None => None,
        };

        let recording = recordings::upsert(
            &mut conn,
            &bucket,
            Some(recording_id.as_str()),
            Some(&track_keys),
            meeting.as_ref().map(|m| m.id),
            if meeting.is_some() { RecordingStatus::Ready } else { RecordingStatus::Orphan },
        )?;

        let meeting = match meeting {
            Some(m) => m,
            // S6: recording with no matching meeting. Recording row persists
            // as an orphan; no transcript, no workflow.
            None => return Ok(None),
        };

        let transcript = transcripts::create(&mut conn, recording.id, meeting.room_id, meeting.user_id)?;
        Ok(Some((transcript.id, recording.id)))
    })
    .await
    .map_err(|e| meet_shared::AppError::internal(e.to_string()))??;

    let (transcript_id, recording_id) = match outcome {
        Some(ids) => ids,
        None => {
            warn!(recording_id = %payload.recording_id, "recording.ready-to-download: meeting not found, recording orphaned");
            return Ok(());
        }
    };

    let dag = multitrack_dag();
    let input = serde_json::to_value(WorkflowInput { transcript_id, recording_id })
        .map_err(|e| meet_shared::AppError::internal(e.to_string()))?;

    let run_id = state.engine.start(&dag, transcript_id, input).await?;
    info!(transcript_id = %transcript_id, run_id = %run_id, "workflow run enqueued");

    Ok(())
}
