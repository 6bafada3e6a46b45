//! Recording-platform webhook payload shapes and verification (§4.12, §6).
//!
//! Example `recording.ready-to-download` body:
//! ```json
//! {
//!   "version": "1.0.0",
//!   "type": "recording.ready-to-download",
//!   "id": "rec-rtd-c3df927c-...",
//!   "payload": {
//!     "recording_id": "08fa0b24-9220-44c5-846c-3f116cf8e738",
//!     "room_name": "Xcm97xRZ08b2dePKb78g",
//!     "tracks": [{"type": "audio", "s3_key": "bucket/room/track-0.webm"}]
//!   },
//!   "event_ts": 1692124192
//! }
//! ```

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEvent {
    #[serde(rename = "participant.joined")]
    ParticipantJoined { payload: ParticipantPayload },
    #[serde(rename = "participant.left")]
    ParticipantLeft { payload: ParticipantPayload },
    #[serde(rename = "recording.started")]
    RecordingStarted { payload: RecordingStartedPayload },
    #[serde(rename = "recording.ready-to-download")]
    RecordingReady { payload: RecordingReadyPayload },
    #[serde(rename = "recording.error")]
    RecordingError { payload: RecordingErrorPayload },
}

#[derive(Debug, Deserialize)]
pub struct ParticipantPayload {
    pub room_name: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub session_id: Option<String>,
    pub duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RecordingStartedPayload {
    pub room_name: Option<String>,
    pub recording_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordingReadyPayload {
    pub room_name: Option<String>,
    pub recording_id: String,
    #[serde(default)]
    pub tracks: Vec<RecordingTrack>,
}

#[derive(Debug, Deserialize)]
pub struct RecordingTrack {
    #[serde(rename = "type")]
    pub kind: String,
    pub s3_key: String,
}

#[derive(Debug, Deserialize)]
pub struct RecordingErrorPayload {
    pub room_name: Option<String>,
    pub recording_id: Option<String>,
    pub error_msg: Option<String>,
}

impl RecordingReadyPayload {
    pub fn audio_track_keys(&self) -> Vec<String> {
        self.tracks
            .iter()
            .filter(|t| t.kind == "audio")
            .map(|t| t.s3_key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recording_ready() {
        let body = r#"{
            "type": "recording.ready-to-download",
            "payload": {
                "recording_id": "08fa0b24-9220-44c5-846c-3f116cf8e738",
                "room_name": "room-1",
                "tracks": [
                    {"type": "audio", "s3_key": "bucket/room-1/track-0.webm"},
                    {"type": "video", "s3_key": "bucket/room-1/track-0.mp4"}
                ]
            }
        }"#;
        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        match event {
            WebhookEvent::RecordingReady { payload } => {
                assert_eq!(payload.audio_track_keys(), vec!["bucket/room-1/track-0.webm"]);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_participant_joined() {
        let body = r#"{"type": "participant.joined", "payload": {"room_name": "room-1", "user_id": "u1"}}"#;
        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        assert!(matches!(event, WebhookEvent::ParticipantJoined { .. }));
    }

    #[test]
    fn rejects_unknown_type() {
        let body = r#"{"type": "something.else", "payload": {}}"#;
        assert!(serde_json::from_str::<WebhookEvent>(body).is_err());
    }
}
