use diesel::prelude::*;
use meet_shared::{AppError, AppResult};
use uuid::Uuid;

use crate::models::RoomRow;
use crate::schema::room;

pub fn get(conn: &mut PgConnection, id: Uuid) -> AppResult<RoomRow> {
    room::table
        .find(id)
        .first::<RoomRow>(conn)
        .map_err(|e| match e {
            diesel::result::Error::NotFound => AppError::not_found("room not found"),
            other => other.into(),
        })
}

/// `None` ⇒ no webhook configured for this room; callers must skip
/// silently rather than treat it as an error (§4.10 step 3).
pub fn webhook_config(conn: &mut PgConnection, id: Uuid) -> AppResult<Option<(String, String)>> {
    let row = get(conn, id)?;
    Ok(match (row.webhook_url, row.webhook_secret) {
        (Some(url), Some(secret)) => Some((url, secret)),
        _ => None,
    })
}
