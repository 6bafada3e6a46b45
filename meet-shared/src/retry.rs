//! Shared exponential-backoff retry policy, generalized from the webhook
//! dispatcher's `RetryPolicy` so the ASR client, LLM client, and outgoing
//! webhook sender all back off the same way.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff with a cap and +/-20% jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Matches the outgoing webhook dispatcher's policy (§4.10): up to 30
    /// attempts, capped at one hour between retries.
    pub fn webhook() -> Self {
        Self {
            max_attempts: 30,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3600),
        }
    }

    /// Matches the remote ASR/LLM client policy (§4.5/§4.8): fewer attempts,
    /// a much tighter cap, since these sit in the synchronous task path.
    pub fn remote_client() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(20),
        }
    }

    /// Delay before attempt `attempt` (0-indexed, so `attempt=0` is the delay
    /// before the *first* retry, i.e. after the initial attempt failed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay * 2u32.saturating_pow(attempt);
        let capped = exp.min(self.max_delay);
        jitter(capped)
    }
}

fn jitter(base: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.8..1.2);
    Duration::from_secs_f64(base.as_secs_f64() * factor)
}

/// Whether an HTTP status code should be retried. 4xx other than 408/429 are
/// permanent failures; 429, 5xx, and network errors are transient.
pub fn is_retryable_status(status: u16) -> bool {
    match status {
        408 | 429 => true,
        400..=499 => false,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
        };
        // jitter is +/-20%; just check monotonic-ish bounds with headroom.
        assert!(policy.delay_for(0) <= Duration::from_millis(1200));
        assert!(policy.delay_for(10) <= Duration::from_millis(9600));
    }

    #[test]
    fn status_retry_rules() {
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
        assert!(is_retryable_status(408));
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
    }
}
