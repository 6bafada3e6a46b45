//! ASR client (C5): one track's audio goes in, a flat list of timestamped
//! words comes out. The caller (the `transcribe_track` task) is responsible
//! for tagging each returned word with its track's speaker index — the
//! backend itself knows nothing about tracks.

use std::time::Duration;

use async_trait::async_trait;
use meet_shared::Word;
use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;

const TIMEOUT_HEAVY: Duration = Duration::from_secs(1800);

#[derive(Serialize)]
struct TranscribeRequest<'a> {
    audio_url: &'a str,
    language: &'a str,
}

#[derive(Deserialize)]
struct RawWord {
    text: String,
    start: f64,
    end: f64,
}

#[derive(Deserialize)]
struct TranscribeResponse {
    words: Vec<RawWord>,
}

#[async_trait]
pub trait AsrClient: Send + Sync {
    async fn transcribe(&self, audio_url: &str, language: &str) -> PipelineResult<Vec<(String, f64, f64)>>;
}

pub struct HttpAsrClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAsrClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into() }
    }
}

#[async_trait]
impl AsrClient for HttpAsrClient {
    /// One attempt per call: the orchestrator owns retry count and backoff
    /// for `transcribe_track` (§4.11's table), so this only needs to
    /// classify failures as transient or permanent, not loop on them.
    async fn transcribe(&self, audio_url: &str, language: &str) -> PipelineResult<Vec<(String, f64, f64)>> {
        let resp = self
            .http
            .post(format!("{}/transcribe", self.base_url))
            .json(&TranscribeRequest { audio_url, language })
            .timeout(TIMEOUT_HEAVY)
            .send()
            .await?
            .error_for_status()?;

        let body: TranscribeResponse = resp.json().await?;
        Ok(body.words.into_iter().map(|w| (w.text, w.start, w.end)).collect())
    }
}

/// Tags ASR output with the originating track's speaker index, producing
/// the `Word` shape the merger consumes.
pub fn tag_track_words(raw: Vec<(String, f64, f64)>, speaker: i32) -> Vec<Word> {
    raw.into_iter()
        .map(|(text, start, end)| Word { text, start, end, speaker })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_words_with_track_speaker() {
        let raw = vec![("hello".to_string(), 0.0, 0.5), ("world".to_string(), 0.5, 1.0)];
        let words = tag_track_words(raw, 2);
        assert!(words.iter().all(|w| w.speaker == 2));
        assert_eq!(words[0].text, "hello");
    }
}
