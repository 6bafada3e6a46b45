use diesel::prelude::*;
use meet_shared::{AppError, AppResult, Participant, Topic, TranscriptEvent};
use uuid::Uuid;

use crate::models::{FinalizeUpdate, NewTranscript, NotificationUpdate, TranscriptRow};
use crate::schema::transcript;
use crate::webvtt;

pub fn create(
    conn: &mut PgConnection,
    recording_id: Uuid,
    room_id: Uuid,
    user_id: Option<Uuid>,
) -> AppResult<TranscriptRow> {
    let new_row = NewTranscript::for_recording(recording_id, room_id, user_id);
    let row = diesel::insert_into(transcript::table)
        .values(&new_row)
        .get_result::<TranscriptRow>(conn)?;
    Ok(row)
}

pub fn get(conn: &mut PgConnection, id: Uuid) -> AppResult<TranscriptRow> {
    transcript::table
        .find(id)
        .first::<TranscriptRow>(conn)
        .map_err(|e| match e {
            diesel::result::Error::NotFound => AppError::not_found("transcript not found"),
            other => other.into(),
        })
}

pub fn set_status(
    conn: &mut PgConnection,
    id: Uuid,
    status: &str,
    workflow_run_id: Option<String>,
) -> AppResult<TranscriptRow> {
    let row = diesel::update(transcript::table.find(id))
        .set((
            transcript::status.eq(status),
            transcript::workflow_run_id.eq(workflow_run_id),
        ))
        .get_result::<TranscriptRow>(conn)?;
    Ok(row)
}

pub fn update_duration(conn: &mut PgConnection, id: Uuid, duration: f64) -> AppResult<TranscriptRow> {
    let row = diesel::update(transcript::table.find(id))
        .set(transcript::duration.eq(duration))
        .get_result::<TranscriptRow>(conn)?;
    Ok(row)
}

pub fn update_waveform(conn: &mut PgConnection, id: Uuid, peaks: &[f32]) -> AppResult<TranscriptRow> {
    let value = serde_json::to_value(peaks).map_err(|e| AppError::internal(e.to_string()))?;
    let row = diesel::update(transcript::table.find(id))
        .set(transcript::waveform.eq(value))
        .get_result::<TranscriptRow>(conn)?;
    Ok(row)
}

/// Overwrite the topic list and regenerate `webvtt` from it in the same
/// statement. `webvtt` must never be accepted as a parameter from callers
/// (§3, §4.13 invariant): this function is the only write path for it.
pub fn update_topics(
    conn: &mut PgConnection,
    id: Uuid,
    topics: &[Topic],
    participants: &[Participant],
) -> AppResult<TranscriptRow> {
    let topics_json = serde_json::to_value(topics).map_err(|e| AppError::internal(e.to_string()))?;
    let rendered = webvtt::render(topics, participants);

    let row = diesel::update(transcript::table.find(id))
        .set((
            transcript::topics.eq(topics_json),
            transcript::webvtt.eq(rendered),
        ))
        .get_result::<TranscriptRow>(conn)?;
    Ok(row)
}

pub fn update_participants(
    conn: &mut PgConnection,
    id: Uuid,
    participants: &[Participant],
) -> AppResult<TranscriptRow> {
    let value = serde_json::to_value(participants).map_err(|e| AppError::internal(e.to_string()))?;
    let row = diesel::update(transcript::table.find(id))
        .set(transcript::participants.eq(value))
        .get_result::<TranscriptRow>(conn)?;
    Ok(row)
}

/// Append one event to the persisted log. Appends are totally ordered per
/// transcript because the read-modify-write happens inside the row's update
/// statement, serialized by Postgres row locking.
pub fn append_event(conn: &mut PgConnection, id: Uuid, event: &TranscriptEvent) -> AppResult<()> {
    let row = get(conn, id)?;
    let mut events = row.events();
    events.push(event.clone());
    let value = serde_json::to_value(&events).map_err(|e| AppError::internal(e.to_string()))?;

    diesel::update(transcript::table.find(id))
        .set(transcript::events.eq(value))
        .execute(conn)?;
    Ok(())
}

/// Finalize per §4.8: on LLM exhaustion fields default to empty strings and
/// the transcript still reaches `status=ended`, never `error`.
pub fn finalize(
    conn: &mut PgConnection,
    id: Uuid,
    title: String,
    short_summary: String,
    long_summary: String,
) -> AppResult<TranscriptRow> {
    let update = FinalizeUpdate {
        status: Some("ended".into()),
        title: Some(title),
        short_summary: Some(short_summary),
        long_summary: Some(long_summary),
        duration: None,
        waveform: None,
    };
    let row = diesel::update(transcript::table.find(id))
        .set(&update)
        .get_result::<TranscriptRow>(conn)?;
    Ok(row)
}

pub fn set_error(conn: &mut PgConnection, id: Uuid) -> AppResult<TranscriptRow> {
    set_status(conn, id, "error", None)
}

pub fn set_audio_deleted(conn: &mut PgConnection, id: Uuid) -> AppResult<TranscriptRow> {
    let update = NotificationUpdate {
        audio_deleted: Some(true),
        zulip_message_id: None,
    };
    let row = diesel::update(transcript::table.find(id))
        .set(&update)
        .get_result::<TranscriptRow>(conn)?;
    Ok(row)
}

pub fn set_zulip_message_id(
    conn: &mut PgConnection,
    id: Uuid,
    message_id: String,
) -> AppResult<TranscriptRow> {
    let update = NotificationUpdate {
        audio_deleted: None,
        zulip_message_id: Some(Some(message_id)),
    };
    let row = diesel::update(transcript::table.find(id))
        .set(&update)
        .get_result::<TranscriptRow>(conn)?;
    Ok(row)
}
