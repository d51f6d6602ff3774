//! Search Error Types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the search backend
#[derive(Debug, Error)]
pub enum SearchError {
    /// Transport-level failure (connection refused, TLS, DNS)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Login rejected or no session key returned
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Backend answered with a non-success status
    #[error("HTTP {status} from {endpoint}: {body}")]
    Http {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The search job reported a failure
    #[error("Search job {sid} failed: {reason}")]
    JobFailed { sid: String, reason: String },

    /// The search job did not finish in time
    #[error("Search job {sid} not done after {after:?}")]
    Timeout { sid: String, after: Duration },
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SearchError::InvalidResponse(err.to_string())
        } else {
            SearchError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::InvalidResponse(err.to_string())
    }
}
