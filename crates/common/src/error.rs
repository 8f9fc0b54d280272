//! Unified error type for the dashboard feeds.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Upstream error (status={status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected payload: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),

}

impl Error {
    /// True for configuration failures, which block a feed until corrected.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// True for transport failures and non-success statuses.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Upstream { .. })
    }

    /// True when the payload did not have the expected shape.
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Json(_) | Error::Parse(_))
    }

    /// Message suitable for display: upstream and config messages are passed
    /// through, everything else collapses to `fallback`.
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            Error::Config(msg) => msg.clone(),
            Error::Upstream { message, .. } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}
