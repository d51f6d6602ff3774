//! Search Backend
//!
//! Models the saved searches that carry SPLaSCH scheduling attributes and
//! runs them as search jobs. The [`SearchBackend`] trait is the seam between
//! the run orchestrator and the backend; [`SplunkClient`] implements it over
//! the Splunk REST API.

mod backend;
mod client;
mod error;
mod job;
mod rule;

pub use backend::{run_search, PollConfig, SearchBackend};
pub use client::{SplunkClient, SplunkConfig};
pub use error::SearchError;
pub use job::{BackendHealth, JobStats, JobStatus, SearchOutcome};
pub use rule::{savedsearch_query, SavedSearch, NOTIFY_OUTPUT};

/// Result rows as returned by the backend, one JSON value per row
pub type ResultRow = serde_json::Value;
