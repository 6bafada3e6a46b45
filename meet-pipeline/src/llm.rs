//! Generic LLM client shared by the topic segmenter (C7) and the title/
//! summary generators (C8). Callers pass a system prompt and a user prompt
//! and get back raw text; structured extraction (e.g. the `{title,
//! summary}` object C7 needs) is the caller's job, since the two call sites
//! want different shapes back.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str, timeout: Duration) -> PipelineResult<String>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    system: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    text: String,
}

pub struct HttpLlmClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLlmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into() }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    /// One attempt per call; retry count and backoff for the calling task
    /// (`detect_topics`, `title`, `long_summary`, `short_summary`) live in
    /// the orchestrator's per-task `TaskDef`, per §4.11's table — except the
    /// per-chunk topic summarizer, which does its own bounded retry loop
    /// around this call since a chunk failure must degrade gracefully
    /// rather than fail the whole `detect_topics` task (§4.7).
    async fn complete(&self, system_prompt: &str, user_prompt: &str, timeout: Duration) -> PipelineResult<String> {
        let resp = self
            .http
            .post(format!("{}/complete", self.base_url))
            .json(&CompletionRequest { system: system_prompt, prompt: user_prompt })
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;

        let body: CompletionResponse = resp.json().await?;
        Ok(body.text)
    }
}

/// Extracts a `{title, summary}` JSON object from an LLM response, tolerant
/// of the model wrapping it in a markdown code fence.
#[derive(Debug, Deserialize)]
pub struct TitleSummary {
    pub title: String,
    pub summary: String,
}

pub fn parse_title_summary(raw: &str) -> Option<TitleSummary> {
    let trimmed = raw.trim().trim_start_matches("```json").trim_start_matches("```").trim_end_matches("```").trim();
    serde_json::from_str(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let out = parse_title_summary(r#"{"title": "Launch plan", "summary": "Discussed Q3 launch."}"#).unwrap();
        assert_eq!(out.title, "Launch plan");
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"title\": \"x\", \"summary\": \"y\"}\n```";
        let out = parse_title_summary(raw).unwrap();
        assert_eq!(out.title, "x");
    }
}
