use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transcript::{Participant, Topic, TranscriptStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookTopicPayload {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub timestamp: f64,
    pub duration: f64,
    pub webvtt: String,
}

impl WebhookTopicPayload {
    pub fn from_topic(topic: &Topic, webvtt: String) -> Self {
        Self {
            id: topic.id,
            title: topic.title.clone(),
            summary: topic.summary.clone(),
            timestamp: topic.timestamp,
            duration: topic.duration,
            webvtt,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookParticipantPayload {
    pub id: Uuid,
    pub name: String,
    pub speaker: Option<i32>,
}

impl From<&Participant> for WebhookParticipantPayload {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            speaker: p.speaker,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRoomPayload {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookCalendarEventPayload {
    pub id: Uuid,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookTranscriptPayload {
    pub id: Uuid,
    pub status: TranscriptStatus,
    pub title: String,
    pub short_summary: String,
    pub long_summary: String,
    pub duration: f64,
    pub topics: Vec<WebhookTopicPayload>,
    pub participants: Vec<WebhookParticipantPayload>,
    pub created_at: DateTime<Utc>,
}

/// Top-level body sent to a room's configured webhook URL on transcript
/// completion. Event type travels in the `X-Webhook-Event` header, not the
/// body, matching the original dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub transcript: WebhookTranscriptPayload,
    pub room: Option<WebhookRoomPayload>,
    pub calendar_event: Option<WebhookCalendarEventPayload>,
    /// Link to the transcript's page in the hosting frontend.
    pub frontend_url: String,
}
