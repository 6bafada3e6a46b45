//! Outgoing webhook dispatcher (§4.10 step 3): signs and delivers the
//! transcript-completion payload to a room's configured `webhook_url`.
//!
//! One attempt per call. The `webhook` task gets 30 retries with up to an
//! hour of backoff between them from its `TaskDef` (§4.11's table), so the
//! orchestrator is already doing the looping a client-side retry loop would
//! duplicate; this only needs to sign the body and classify the response.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use meet_shared::WebhookPayload;

use crate::error::{PipelineError, PipelineResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn deliver_webhook(
    http: &reqwest::Client,
    url: &str,
    secret: &str,
    payload: &WebhookPayload,
    attempt: u32,
) -> PipelineResult<()> {
    let body = serde_json::to_vec(payload).map_err(|e| PipelineError::permanent(e.to_string()))?;
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let signature = meet_shared::middleware::header_value(secret, timestamp, &body);

    http.post(url)
        .header("Content-Type", "application/json")
        .header("User-Agent", "Meet-Webhook/1.0")
        .header("X-Webhook-Signature", signature)
        .header("X-Webhook-Event", "transcript.completed")
        .header("X-Webhook-Retry", attempt.to_string())
        .timeout(REQUEST_TIMEOUT)
        .body(body)
        .send()
        .await?
        .error_for_status()
        .map_err(PipelineError::from)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_timeout_is_bounded() {
        assert_eq!(REQUEST_TIMEOUT, Duration::from_secs(10));
    }
}
