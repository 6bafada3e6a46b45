use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use meet_shared::{Participant, Topic, TranscriptEvent, TranscriptStatus};

use crate::schema::{meeting, meeting_consent, recording, room, transcript};

#[derive(Debug, Queryable, Identifiable, Selectable, Clone)]
#[diesel(table_name = transcript, check_for_backend(diesel::pg::Pg))]
pub struct TranscriptRow {
    pub id: Uuid,
    pub status: String,
    pub title: String,
    pub short_summary: String,
    pub long_summary: String,
    pub webvtt: String,
    pub duration: f64,
    pub topics: serde_json::Value,
    pub participants: serde_json::Value,
    pub events: serde_json::Value,
    pub waveform: serde_json::Value,
    pub recording_id: Option<Uuid>,
    pub room_id: Uuid,
    pub user_id: Option<Uuid>,
    pub workflow_run_id: Option<String>,
    pub zulip_message_id: Option<String>,
    pub audio_deleted: bool,
    pub source_language: String,
    pub target_language: String,
    pub created_at: DateTime<Utc>,
}

impl TranscriptRow {
    pub fn status(&self) -> TranscriptStatus {
        match self.status.as_str() {
            "idle" => TranscriptStatus::Idle,
            "processing" => TranscriptStatus::Processing,
            "ended" => TranscriptStatus::Ended,
            _ => TranscriptStatus::Error,
        }
    }

    pub fn topics(&self) -> Vec<Topic> {
        serde_json::from_value(self.topics.clone()).unwrap_or_default()
    }

    pub fn participants(&self) -> Vec<Participant> {
        serde_json::from_value(self.participants.clone()).unwrap_or_default()
    }

    pub fn events(&self) -> Vec<TranscriptEvent> {
        serde_json::from_value(self.events.clone()).unwrap_or_default()
    }

    pub fn waveform(&self) -> Vec<f32> {
        serde_json::from_value(self.waveform.clone()).unwrap_or_default()
    }

    pub fn into_shared(self) -> meet_shared::Transcript {
        meet_shared::Transcript {
            id: self.id,
            status: self.status(),
            source_language: self.source_language.clone(),
            target_language: self.target_language.clone(),
            duration: self.duration,
            title: self.title.clone(),
            short_summary: self.short_summary.clone(),
            long_summary: self.long_summary.clone(),
            webvtt: self.webvtt.clone(),
            waveform: self.waveform(),
            topics: self.topics(),
            participants: self.participants(),
            workflow_run_id: self.workflow_run_id.clone(),
            audio_deleted: self.audio_deleted,
            zulip_message_id: self.zulip_message_id.clone(),
            recording_id: self.recording_id,
            room_id: self.room_id,
            user_id: self.user_id,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = transcript)]
pub struct NewTranscript {
    pub id: Uuid,
    pub status: String,
    pub title: String,
    pub short_summary: String,
    pub long_summary: String,
    pub webvtt: String,
    pub duration: f64,
    pub topics: serde_json::Value,
    pub participants: serde_json::Value,
    pub events: serde_json::Value,
    pub waveform: serde_json::Value,
    pub recording_id: Option<Uuid>,
    pub room_id: Uuid,
    pub user_id: Option<Uuid>,
    pub source_language: String,
    pub target_language: String,
}

impl NewTranscript {
    pub fn for_recording(recording_id: Uuid, room_id: Uuid, user_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::now_v7(),
            status: "idle".into(),
            title: String::new(),
            short_summary: String::new(),
            long_summary: String::new(),
            webvtt: String::new(),
            duration: 0.0,
            topics: serde_json::json!([]),
            participants: serde_json::json!([]),
            events: serde_json::json!([]),
            waveform: serde_json::json!([]),
            recording_id: Some(recording_id),
            room_id,
            user_id,
            source_language: "en".into(),
            target_language: "en".into(),
        }
    }
}

#[derive(Debug, AsChangeset, Default)]
#[diesel(table_name = transcript)]
pub struct FinalizeUpdate {
    pub status: Option<String>,
    pub title: Option<String>,
    pub short_summary: Option<String>,
    pub long_summary: Option<String>,
    pub duration: Option<f64>,
    pub waveform: Option<serde_json::Value>,
}

#[derive(Debug, AsChangeset, Default)]
#[diesel(table_name = transcript)]
pub struct NotificationUpdate {
    pub audio_deleted: Option<bool>,
    pub zulip_message_id: Option<Option<String>>,
}

// --- Recording ---

#[derive(Debug, Queryable, Identifiable, Selectable, Clone, Serialize)]
#[diesel(table_name = recording, check_for_backend(diesel::pg::Pg))]
pub struct RecordingRow {
    pub id: Uuid,
    pub bucket_name: String,
    pub object_key: Option<String>,
    pub track_keys: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
    pub status: String,
    pub meeting_id: Option<Uuid>,
}

impl RecordingRow {
    pub fn track_keys(&self) -> Option<Vec<String>> {
        self.track_keys
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn is_multitrack(&self) -> bool {
        self.track_keys()
            .map(|k| !k.is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = recording)]
pub struct NewRecording {
    pub id: Uuid,
    pub bucket_name: String,
    pub object_key: Option<String>,
    pub track_keys: Option<serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
    pub status: String,
    pub meeting_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Clone)]
pub enum RecordingStatus {
    Ready,
    Orphan,
    Error,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Orphan => "orphan",
            Self::Error => "error",
        }
    }
}

// --- Meeting ---

#[derive(Debug, Queryable, Identifiable, Selectable, Clone)]
#[diesel(table_name = meeting, check_for_backend(diesel::pg::Pg))]
pub struct MeetingRow {
    pub id: Uuid,
    pub room_name: String,
    pub room_url: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub user_id: Option<Uuid>,
    pub room_id: Uuid,
}

// --- Room ---

#[derive(Debug, Queryable, Identifiable, Selectable, Clone)]
#[diesel(table_name = room, check_for_backend(diesel::pg::Pg))]
pub struct RoomRow {
    pub id: Uuid,
    pub name: String,
    pub user_id: Option<Uuid>,
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub is_locked: bool,
    pub recording_type: String,
    pub recording_trigger: String,
    pub ics_url: Option<String>,
    pub ics_enabled: bool,
}

// --- Meeting consent ---

#[derive(Debug, Queryable, Identifiable, Selectable, Clone)]
#[diesel(table_name = meeting_consent, primary_key(meeting_id, user_id), check_for_backend(diesel::pg::Pg))]
pub struct MeetingConsentRow {
    pub meeting_id: Uuid,
    pub user_id: Uuid,
    pub consent_given: bool,
    pub consent_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = meeting_consent)]
pub struct NewMeetingConsent {
    pub meeting_id: Uuid,
    pub user_id: Uuid,
    pub consent_given: bool,
    pub consent_timestamp: Option<DateTime<Utc>>,
}
