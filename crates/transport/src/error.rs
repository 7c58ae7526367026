use thiserror::Error;

/// Errors raised by the socket worker.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid backend url {url}: {reason}")]
    BadUrl { url: String, reason: String },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("failed to encode outbound frame: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode inbound frame: {0}")]
    Decode(#[source] serde_json::Error),
}

impl TransportError {
    /// Fatal errors cannot be fixed by retrying the connection, so the
    /// worker reports them once and stops attempting.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::BadUrl { .. }
                | TransportError::WebSocket(tungstenite::Error::Url(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_url_is_fatal() {
        let err = TransportError::BadUrl {
            url: "not a url".into(),
            reason: "relative URL without a base".into(),
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn test_decode_error_is_not_fatal() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!TransportError::Decode(err).is_fatal());
    }
}
