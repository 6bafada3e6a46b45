use diesel::prelude::*;
use meet_shared::{AppError, AppResult};
use uuid::Uuid;

use crate::models::MeetingRow;
use crate::schema::meeting;

pub fn get(conn: &mut PgConnection, id: Uuid) -> AppResult<MeetingRow> {
    meeting::table
        .find(id)
        .first::<MeetingRow>(conn)
        .map_err(|e| match e {
            diesel::result::Error::NotFound => AppError::not_found("meeting not found"),
            other => other.into(),
        })
}

pub fn find_by_room_url(conn: &mut PgConnection, room_url: &str) -> AppResult<Option<MeetingRow>> {
    let row = meeting::table
        .filter(meeting::room_url.eq(room_url))
        .order(meeting::start_date.desc())
        .first::<MeetingRow>(conn)
        .optional()?;
    Ok(row)
}

/// The recording platform's webhooks identify a room by its short name, not
/// the full room URL; the most recently started meeting for that name is
/// the one a `recording.ready-to-download` event belongs to.
pub fn find_by_room_name(conn: &mut PgConnection, room_name: &str) -> AppResult<Option<MeetingRow>> {
    let row = meeting::table
        .filter(meeting::room_name.eq(room_name))
        .order(meeting::start_date.desc())
        .first::<MeetingRow>(conn)
        .optional()?;
    Ok(row)
}
