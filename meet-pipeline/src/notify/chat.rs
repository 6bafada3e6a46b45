//! Chat integration post (§4.10 step 2): renders the title and short summary
//! into a message for the meeting's configured chat system (a Zulip-style
//! stream/topic target). A missing configuration is not an error — the
//! `chat_post` task checks for one before calling this at all.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Posts a new message, returning its id for later in-place updates.
    async fn post(&self, channel: &str, title: &str, short_summary: &str) -> PipelineResult<String>;

    /// Edits a previously posted message in place, e.g. once a transcript is
    /// re-finalized after force-replay.
    async fn update(&self, message_id: &str, title: &str, short_summary: &str) -> PipelineResult<()>;
}

#[derive(Serialize)]
struct PostRequest<'a> {
    channel: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct PostResponse {
    message_id: String,
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    content: &'a str,
}

pub struct HttpChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpChatClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into(), api_key: api_key.into() }
    }
}

fn render_message(title: &str, short_summary: &str) -> String {
    format!("**{title}**\n\n{short_summary}")
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn post(&self, channel: &str, title: &str, short_summary: &str) -> PipelineResult<String> {
        let content = render_message(title, short_summary);
        let resp: PostResponse = self
            .http
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&PostRequest { channel, content: &content })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.message_id)
    }

    async fn update(&self, message_id: &str, title: &str, short_summary: &str) -> PipelineResult<()> {
        let content = render_message(title, short_summary);
        self.http
            .patch(format!("{}/messages/{message_id}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&UpdateRequest { content: &content })
            .send()
            .await?
            .error_for_status()
            .map_err(PipelineError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_title_and_summary() {
        let msg = render_message("Launch review", "We shipped the beta.");
        assert!(msg.contains("Launch review"));
        assert!(msg.contains("We shipped the beta."));
    }
}
