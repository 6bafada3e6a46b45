use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dag::DagStatus;
use super::transcript::{Participant, Topic};

/// One entry in a transcript's append-only event log. Mirrors the WebSocket
/// event stream 1:1: every event broadcast to subscribers is also appended
/// here, so a late-joining client can replay history instead of waiting for
/// the next push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub id: Uuid,
    pub transcript_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl TranscriptEvent {
    pub fn new(transcript_id: Uuid, kind: EventKind) -> Self {
        Self {
            id: Uuid::now_v7(),
            transcript_id,
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Discriminated by `event` per the WebSocket protocol (§6). `DagStatus` is
/// broadcast-only: it is pushed over the socket but never appended to the
/// persisted event log, since it is fully derived from orchestrator state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum EventKind {
    #[serde(rename = "DAG_STATUS")]
    DagStatus(DagStatus),
    #[serde(rename = "STATUS")]
    Status { status: super::transcript::TranscriptStatus },
    #[serde(rename = "TOPIC")]
    Topic(Topic),
    #[serde(rename = "FINAL_TITLE")]
    FinalTitle { title: String },
    #[serde(rename = "FINAL_LONG_SUMMARY")]
    FinalLongSummary { summary: String },
    #[serde(rename = "FINAL_SHORT_SUMMARY")]
    FinalShortSummary { summary: String },
    #[serde(rename = "ACTION_ITEMS")]
    ActionItems { items: Vec<String> },
    #[serde(rename = "DURATION")]
    Duration { duration: f64 },
    #[serde(rename = "WAVEFORM")]
    Waveform { peaks: Vec<f32> },
    #[serde(rename = "PARTICIPANTS")]
    Participants { participants: Vec<Participant> },
    #[serde(rename = "ERROR")]
    Error { message: String },
}

impl EventKind {
    /// Whether this variant is ever written to the persisted `events` log,
    /// as opposed to being transient, pub/sub-only broadcast state.
    pub fn is_persisted(&self) -> bool {
        !matches!(self, EventKind::DagStatus(_))
    }
}
