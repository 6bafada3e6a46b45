//! HMAC-SHA256 signing and verification for both directions of webhook
//! traffic, which use two different header conventions:
//!
//! - Outgoing (transcript-completion dispatcher): a single
//!   `X-Webhook-Signature: t=<unix_seconds>,v1=<hex_hmac>` header, signing
//!   `{timestamp}.{body}`. See `sign`/`header_value`/`verify`.
//! - Incoming (recording platform, §6): a bare hex `X-Webhook-Signature`
//!   header plus a separate `X-Webhook-Timestamp` header, over the same
//!   `{timestamp}.{body}` message. See `verify_inbound`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub fn sign(secret: &str, timestamp: u64, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

pub fn header_value(secret: &str, timestamp: u64, body: &[u8]) -> String {
    format!("t={timestamp},v1={}", sign(secret, timestamp, body))
}

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed signature header")]
    Malformed,
    #[error("signature does not match")]
    Mismatch,
    #[error("timestamp outside replay window")]
    Expired,
}

/// Parse and verify an `X-Webhook-Signature` header against `body`, with a
/// replay window of `max_age_secs`.
pub fn verify(
    secret: &str,
    header: &str,
    body: &[u8],
    now: u64,
    max_age_secs: u64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<u64> = None;
    let mut signature: Option<&str> = None;

    for part in header.split(',') {
        let mut kv = part.splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(v)) => timestamp = v.parse().ok(),
            (Some("v1"), Some(v)) => signature = Some(v),
            _ => {}
        }
    }

    let (timestamp, signature) = match (timestamp, signature) {
        (Some(t), Some(s)) => (t, s),
        _ => return Err(SignatureError::Malformed),
    };

    if now.saturating_sub(timestamp) > max_age_secs {
        return Err(SignatureError::Expired);
    }

    let expected = sign(secret, timestamp, body);
    if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Verifies the recording platform's webhook signature (§6), which arrives
/// as a bare hex digest in `X-Webhook-Signature` with the timestamp in its
/// own `X-Webhook-Timestamp` header, rather than the combined `t=,v1=`
/// format the outgoing dispatcher uses.
pub fn verify_inbound(
    secret: &str,
    signature: &str,
    timestamp: &str,
    body: &[u8],
    now: u64,
    max_age_secs: u64,
) -> Result<(), SignatureError> {
    if signature.is_empty() {
        return Err(SignatureError::Malformed);
    }
    let timestamp: u64 = timestamp.parse().map_err(|_| SignatureError::Malformed)?;

    if now.saturating_sub(timestamp) > max_age_secs {
        return Err(SignatureError::Expired);
    }

    let expected = sign(secret, timestamp, body);
    if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let secret = "shh";
        let body = b"{\"hello\":\"world\"}";
        let header = header_value(secret, 1_000, body);
        assert!(verify(secret, &header, body, 1_010, 300).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let secret = "shh";
        let header = header_value(secret, 1_000, b"original");
        assert!(matches!(
            verify(secret, &header, b"tampered", 1_010, 300),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn rejects_expired() {
        let secret = "shh";
        let body = b"payload";
        let header = header_value(secret, 1_000, body);
        assert!(matches!(
            verify(secret, &header, body, 2_000, 300),
            Err(SignatureError::Expired)
        ));
    }

    #[test]
    fn verify_inbound_roundtrip() {
        let secret = "shh";
        let body = br#"{"type":"recording.ready-to-download"}"#;
        let signature = sign(secret, 1_000, body);
        assert!(verify_inbound(secret, &signature, "1000", body, 1_010, 300).is_ok());
    }

    #[test]
    fn verify_inbound_rejects_tampered_body() {
        let secret = "shh";
        let signature = sign(secret, 1_000, b"original");
        assert!(matches!(
            verify_inbound(secret, &signature, "1000", b"tampered", 1_010, 300),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn verify_inbound_rejects_expired() {
        let secret = "shh";
        let body = b"payload";
        let signature = sign(secret, 1_000, body);
        assert!(matches!(
            verify_inbound(secret, &signature, "1000", body, 2_000, 300),
            Err(SignatureError::Expired)
        ));
    }

    #[test]
    fn verify_inbound_rejects_malformed_timestamp() {
        let secret = "shh";
        let signature = sign(secret, 1_000, b"payload");
        assert!(matches!(
            verify_inbound(secret, &signature, "not-a-number", b"payload", 1_010, 300),
            Err(SignatureError::Malformed)
        ));
    }
}
