use thiserror::Error;

use crate::state::RateLimitInfo;

pub type Result<T> = std::result::Result<T, ChatError>;

/// Every failure a chat or health request can end in.
///
/// The `Display` text is what the store surfaces as its `error` string.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Too many requests. Please wait {retry_after} seconds.")]
    RateLimited {
        retry_after: u64,
        quota: Option<RateLimitInfo>,
    },

    /// Non-2xx, non-429 response
    #[error("{message}")]
    Request { status: u16, message: String },

    /// An `error` event in the agent stream
    #[error("{0}")]
    Agent(String),

    #[error("Cannot connect to server: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response from server: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ChatError {
    pub fn request_failed(status: u16) -> Self {
        ChatError::Request {
            status,
            message: format!("Request failed: {}", status),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ChatError::RateLimited { .. })
    }

    /// True for failures that never reached an HTTP response
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ChatError::Network(_) | ChatError::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_message_names_wait_time() {
        let err = ChatError::RateLimited {
            retry_after: 30,
            quota: None,
        };
        assert_eq!(err.to_string(), "Too many requests. Please wait 30 seconds.");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_request_failed_falls_back_to_status() {
        let err = ChatError::request_failed(502);
        assert_eq!(err.to_string(), "Request failed: 502");
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_decode_is_connectivity() {
        let err: ChatError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(err.is_connectivity());
    }
}
