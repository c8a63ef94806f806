use thiserror::Error;

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// One failed outbound request
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Rate limiting, timeouts, server errors and transport failures are
    /// worth another attempt; other client errors and bad payloads are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Status { status, .. } => matches!(status, 408 | 425 | 429 | 500..=599),
            FetchError::Decode(_) => false,
        }
    }
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => FetchError::Status {
                status,
                body: response.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(transport) => FetchError::Network(transport.to_string()),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            status: code,
            body: String::new(),
        }
    }

    #[test]
    fn test_retryable_statuses() {
        for code in [408, 425, 429, 500, 502, 503, 504] {
            assert!(status(code).is_retryable(), "{} should be retryable", code);
        }
        for code in [400, 401, 403, 404, 422] {
            assert!(!status(code).is_retryable(), "{} should not be retryable", code);
        }
    }

    #[test]
    fn test_network_and_decode() {
        assert!(FetchError::Network("connection reset".to_string()).is_retryable());
        assert!(!FetchError::Decode("expected value".to_string()).is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(status(503).to_string(), "HTTP error (status 503): ");
        let err: FetchError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(err.to_string().starts_with("Decode error"));
    }
}
