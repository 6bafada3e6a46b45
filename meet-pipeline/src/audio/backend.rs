use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Output of padding one track. `passthrough=true` means the resolved offset
/// was <= 0 and the padder must not re-encode (§4.2's round-trip rule): the
/// caller reuses the source key unchanged rather than uploading `bytes`.
pub struct PadOutput {
    pub bytes: Vec<u8>,
    pub offset_secs: f64,
    pub passthrough: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixdownOutput {
    pub duration_ms: u64,
}

/// Abstracts C2/C3/C4 over two implementations selected by configuration
/// (§9 "Dynamic dispatch over processors"): local in-process DSP, or HTTP
/// offload to a remote CPU container. Every method takes presigned URLs, not
/// raw credentials, per C1's "other components accept a presigned URL"
/// contract.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn pad_track(&self, source_url: &str) -> PipelineResult<PadOutput>;

    /// Returns the mixed bytes plus duration; callers upload the bytes and
    /// persist `duration_ms` separately.
    async fn mixdown(&self, track_urls: &[String]) -> PipelineResult<(Vec<u8>, MixdownOutput)>;

    async fn waveform(&self, mix_url: &str, buckets: usize) -> PipelineResult<Vec<f32>>;
}

/// In-process DSP using `symphonia` (decode) + `rubato` (resample) +
/// `hound` (PCM container). Produces WAV rather than WebM/Opus/MP3 — see
/// DESIGN.md for why that substitution is in scope here.
pub struct LocalAudioBackend {
    http: reqwest::Client,
}

impl LocalAudioBackend {
    pub fn new() -> Self {
        Self { http: reqwest::Client::new() }
    }

    async fn fetch(&self, url: &str) -> PipelineResult<Vec<u8>> {
        let resp = self.http.get(url).send().await?;
        let resp = resp.error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    }
}

impl Default for LocalAudioBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioBackend for LocalAudioBackend {
    async fn pad_track(&self, source_url: &str) -> PipelineResult<PadOutput> {
        let bytes = self.fetch(source_url).await?;
        tokio::task::spawn_blocking(move || super::padder::pad(&bytes))
            .await
            .map_err(|e| PipelineError::permanent(format!("pad_track task panicked: {e}")))?
    }

    async fn mixdown(&self, track_urls: &[String]) -> PipelineResult<(Vec<u8>, MixdownOutput)> {
        let mut tracks = Vec::with_capacity(track_urls.len());
        for url in track_urls {
            tracks.push(self.fetch(url).await?);
        }
        tokio::task::spawn_blocking(move || super::mixdown::mixdown(&tracks))
            .await
            .map_err(|e| PipelineError::permanent(format!("mixdown task panicked: {e}")))?
    }

    async fn waveform(&self, mix_url: &str, buckets: usize) -> PipelineResult<Vec<f32>> {
        let bytes = self.fetch(mix_url).await?;
        tokio::task::spawn_blocking(move || super::waveform::extract(&bytes, buckets))
            .await
            .map_err(|e| PipelineError::permanent(format!("waveform task panicked: {e}")))?
    }
}

/// Delegates to a configured offload HTTP endpoint so CPU-bound DSP can run
/// on dedicated worker containers instead of the orchestrator's own process
/// (§5's "abstract this so the same task can run locally or remotely").
pub struct RemoteAudioBackend {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteAudioBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Serialize)]
struct PadRequest<'a> {
    source_url: &'a str,
}

#[derive(Deserialize)]
struct PadResponse {
    object_key: Option<String>,
    offset_secs: f64,
    passthrough: bool,
}

#[derive(Serialize)]
struct MixdownRequest<'a> {
    track_urls: &'a [String],
}

#[derive(Deserialize)]
struct MixdownResponse {
    duration_ms: u64,
}

#[derive(Serialize)]
struct WaveformRequest<'a> {
    mix_url: &'a str,
    buckets: usize,
}

#[derive(Deserialize)]
struct WaveformResponse {
    peaks: Vec<f32>,
}

#[async_trait]
impl AudioBackend for RemoteAudioBackend {
    async fn pad_track(&self, source_url: &str) -> PipelineResult<PadOutput> {
        let resp: PadResponse = self
            .http
            .post(format!("{}/pad_track", self.base_url))
            .json(&PadRequest { source_url })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(PadOutput {
            bytes: Vec::new(),
            offset_secs: resp.offset_secs,
            passthrough: resp.passthrough || resp.object_key.is_none(),
        })
    }

    async fn mixdown(&self, track_urls: &[String]) -> PipelineResult<(Vec<u8>, MixdownOutput)> {
        let resp: MixdownResponse = self
            .http
            .post(format!("{}/mixdown", self.base_url))
            .json(&MixdownRequest { track_urls })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok((Vec::new(), MixdownOutput { duration_ms: resp.duration_ms }))
    }

    async fn waveform(&self, mix_url: &str, buckets: usize) -> PipelineResult<Vec<f32>> {
        let resp: WaveformResponse = self
            .http
            .post(format!("{}/waveform", self.base_url))
            .json(&WaveformRequest { mix_url, buckets })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp.peaks)
    }
}
