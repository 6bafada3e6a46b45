use diesel::prelude::*;
use meet_shared::AppResult;
use uuid::Uuid;

use crate::models::{MeetingConsentRow, NewMeetingConsent};
use crate::schema::meeting_consent;

pub fn upsert(
    conn: &mut PgConnection,
    meeting_id: Uuid,
    user_id: Uuid,
    consent_given: bool,
) -> AppResult<MeetingConsentRow> {
    let new_row = NewMeetingConsent {
        meeting_id,
        user_id,
        consent_given,
        consent_timestamp: Some(chrono::Utc::now()),
    };

    let row = diesel::insert_into(meeting_consent::table)
        .values(&new_row)
        .on_conflict((meeting_consent::meeting_id, meeting_consent::user_id))
        .do_update()
        .set((
            meeting_consent::consent_given.eq(consent_given),
            meeting_consent::consent_timestamp.eq(chrono::Utc::now()),
        ))
        .get_result::<MeetingConsentRow>(conn)?;

    Ok(row)
}

/// §4.10 step 1: any denied participant triggers audio deletion.
pub fn any_denied(conn: &mut PgConnection, meeting_id: Uuid) -> AppResult<bool> {
    let denied_count: i64 = meeting_consent::table
        .filter(meeting_consent::meeting_id.eq(meeting_id))
        .filter(meeting_consent::consent_given.eq(false))
        .count()
        .get_result(conn)?;
    Ok(denied_count > 0)
}
