use diesel::prelude::*;
use meet_shared::{AppError, AppResult};
use uuid::Uuid;

use crate::models::{NewRecording, RecordingRow, RecordingStatus};
use crate::schema::recording;

/// Idempotent intake per §4.12: unique `(bucket_name, object_key)` with
/// `ON CONFLICT DO NOTHING`. Returns the existing row on a duplicate webhook
/// delivery instead of erroring.
pub fn upsert(
    conn: &mut PgConnection,
    bucket_name: &str,
    object_key: Option<&str>,
    track_keys: Option<&[String]>,
    meeting_id: Option<Uuid>,
    status: RecordingStatus,
) -> AppResult<RecordingRow> {
    let track_keys_json = track_keys
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| AppError::internal(e.to_string()))?;

    let new_row = NewRecording {
        id: Uuid::now_v7(),
        bucket_name: bucket_name.to_string(),
        object_key: object_key.map(|s| s.to_string()),
        track_keys: track_keys_json,
        recorded_at: chrono::Utc::now(),
        status: status.as_str().to_string(),
        meeting_id,
    };

    diesel::insert_into(recording::table)
        .values(&new_row)
        .on_conflict((recording::bucket_name, recording::object_key))
        .do_nothing()
        .execute(conn)?;

    let mut query = recording::table.filter(recording::bucket_name.eq(bucket_name)).into_boxed();
    query = match object_key {
        Some(key) => query.filter(recording::object_key.eq(key)),
        None => query.filter(recording::object_key.is_null()),
    };

    query
        .first::<RecordingRow>(conn)
        .map_err(|e| match e {
            diesel::result::Error::NotFound => {
                AppError::internal("recording upsert returned no row")
            }
            other => other.into(),
        })
}

pub fn get(conn: &mut PgConnection, id: Uuid) -> AppResult<RecordingRow> {
    recording::table
        .find(id)
        .first::<RecordingRow>(conn)
        .map_err(|e| match e {
            diesel::result::Error::NotFound => AppError::not_found("recording not found"),
            other => other.into(),
        })
}

pub fn set_meeting(conn: &mut PgConnection, id: Uuid, meeting_id: Uuid) -> AppResult<RecordingRow> {
    let row = diesel::update(recording::table.find(id))
        .set(recording::meeting_id.eq(meeting_id))
        .get_result::<RecordingRow>(conn)?;
    Ok(row)
}
