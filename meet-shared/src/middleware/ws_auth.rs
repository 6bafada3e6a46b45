//! Bearer-token auth carried over the `Sec-WebSocket-Protocol` header,
//! since browsers cannot set arbitrary headers on a WebSocket handshake.
//! The client sends `Sec-WebSocket-Protocol: bearer, <token>`; the server
//! must echo back `bearer` as the negotiated subprotocol or the browser
//! will close the connection.

pub const BEARER_SUBPROTOCOL: &str = "bearer";

/// Extract the bearer token from a raw `Sec-WebSocket-Protocol` header
/// value of the form `"bearer, <token>"`.
pub fn extract_bearer_token(header_value: &str) -> Option<String> {
    let mut parts = header_value.split(',').map(|s| s.trim());
    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case(BEARER_SUBPROTOCOL) {
        return None;
    }
    let token = parts.next()?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_token() {
        assert_eq!(
            extract_bearer_token("bearer, abc123"),
            Some("abc123".to_string())
        );
    }

    #[test]
    fn rejects_wrong_scheme() {
        assert_eq!(extract_bearer_token("basic, abc123"), None);
    }

    #[test]
    fn rejects_missing_token() {
        assert_eq!(extract_bearer_token("bearer"), None);
        assert_eq!(extract_bearer_token("bearer,"), None);
    }
}
