//! Error types for the lathermail client

use thiserror::Error;

/// Result type for lathermail client operations
pub type LathermailResult<T> = Result<T, LathermailError>;

/// Errors that can occur while talking to a lathermail server
#[derive(Debug, Error)]
pub enum LathermailError {
    /// Server answered with a status >= 400
    #[error("Invalid status {status}.\n{body}")]
    InvalidStatus { status: u16, body: String },

    /// Body could not be interpreted as the expected JSON
    #[error("lathermail: url: {url}, status: {status}, response: {body}")]
    InvalidResponse {
        url: String,
        status: u16,
        body: String,
    },

    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Base URL or resource path could not be joined
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A datetime could not be resolved to UTC
    #[error("Timezone error: {0}")]
    Timezone(String),

    /// A filter datetime string could not be parsed
    #[error("Invalid datetime: {0}")]
    InvalidDateTime(String),

    /// Invalid or incomplete client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LathermailError {
    /// HTTP status carried by the error, if any
    pub fn code(&self) -> Option<u16> {
        match self {
            LathermailError::InvalidStatus { status, .. }
            | LathermailError::InvalidResponse { status, .. } => Some(*status),
            LathermailError::RequestFailed(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
