use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptStatus {
    Idle,
    Processing,
    Ended,
    Error,
}

impl std::fmt::Display for TranscriptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Processing => "processing",
            Self::Ended => "ended",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// A single ASR/merged word, meeting-relative in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub speaker: i32,
}

impl Word {
    pub fn is_terminal_punctuation(&self) -> bool {
        self.text
            .chars()
            .last()
            .map(|c| matches!(c, '.' | '?' | '!'))
            .unwrap_or(false)
    }

    pub fn starts_uppercase(&self) -> bool {
        self.text
            .chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false)
    }
}

/// A topic segment: a contiguous slice of the merged word stream with an
/// LLM-generated title and summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub timestamp: f64,
    pub duration: f64,
    pub words: Vec<Word>,
}

impl Topic {
    /// Build a topic from its word slice, deriving timestamp/duration per
    /// spec §4.7 step 4: `timestamp = words[0].start`,
    /// `duration = words[-1].end - timestamp`.
    pub fn from_words(title: String, summary: String, words: Vec<Word>) -> Option<Self> {
        let first = words.first()?;
        let last = words.last()?;
        let timestamp = first.start;
        let duration = (last.end - timestamp).max(0.0);
        Some(Self {
            id: Uuid::now_v7(),
            title,
            summary,
            timestamp,
            duration,
            words,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub speaker: Option<i32>,
    pub name: String,
    #[serde(default)]
    pub consent: Option<ConsentState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentState {
    Given,
    Denied,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: Uuid,
    pub status: TranscriptStatus,
    pub source_language: String,
    pub target_language: String,
    pub duration: f64,
    pub title: String,
    pub short_summary: String,
    pub long_summary: String,
    pub webvtt: String,
    pub waveform: Vec<f32>,
    pub topics: Vec<Topic>,
    pub participants: Vec<Participant>,
    pub workflow_run_id: Option<String>,
    pub audio_deleted: bool,
    pub zulip_message_id: Option<String>,
    pub recording_id: Option<Uuid>,
    pub room_id: Uuid,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Transcript {
    /// Invariant 1 (§8): sum of topic durations must not exceed the
    /// transcript duration by more than `epsilon`.
    pub fn topics_duration_within_bound(&self, epsilon: f64) -> bool {
        let total: f64 = self.topics.iter().map(|t| t.duration).sum();
        total <= self.duration + epsilon
    }

    /// Invariant 2 (§8): every word in a topic lies within the topic's
    /// `[timestamp, timestamp + duration + epsilon]` window.
    pub fn words_within_topic_bounds(&self, epsilon: f64) -> bool {
        self.topics.iter().all(|topic| {
            topic.words.iter().all(|w| {
                topic.timestamp <= w.start + epsilon
                    && w.end <= topic.timestamp + topic.duration + epsilon
            })
        })
    }

    /// Invariant 3 (§8): topic timestamps are strictly non-decreasing.
    pub fn topics_ordered(&self) -> bool {
        self.topics
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    }

    pub fn at_most_one_participant_per_speaker(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.participants
            .iter()
            .filter_map(|p| p.speaker)
            .all(|s| seen.insert(s))
    }
}
