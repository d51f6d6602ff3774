//! Search Job Types

use crate::ResultRow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend health as reported by the server info endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendHealth {
    Healthy,
    Degraded,
    /// Anything outside the nominal set, with the raw status
    Unhealthy(String),
}

impl BackendHealth {
    /// Map a Splunk `health_info` value
    pub fn from_status(status: &str) -> Self {
        match status {
            "green" => BackendHealth::Healthy,
            "yellow" => BackendHealth::Degraded,
            other => BackendHealth::Unhealthy(other.to_string()),
        }
    }

    /// Healthy or degraded; a run continues without warning
    pub fn is_acceptable(&self) -> bool {
        matches!(self, BackendHealth::Healthy | BackendHealth::Degraded)
    }

    pub fn as_str(&self) -> &str {
        match self {
            BackendHealth::Healthy => "green",
            BackendHealth::Degraded => "yellow",
            BackendHealth::Unhealthy(raw) => raw,
        }
    }
}

impl fmt::Display for BackendHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress snapshot of a running search job
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobStatus {
    pub is_done: bool,
    pub is_failed: bool,
    /// Fraction of the job completed, 0.0 to 1.0
    pub done_progress: f64,
    pub scan_count: u64,
    pub event_count: u64,
    pub result_count: u64,
    /// Backend messages explaining a failure, if any
    pub messages: Vec<String>,
}

/// Statistics recorded for a finished job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub is_done: bool,
    /// Percent complete, 0 to 100
    pub done_progress: f64,
    pub scan_count: u64,
    pub event_count: u64,
    pub result_count: u64,
    pub job_id: String,
}

impl JobStats {
    pub fn from_status(job_id: &str, status: &JobStatus) -> Self {
        Self {
            is_done: status.is_done,
            done_progress: status.done_progress * 100.0,
            scan_count: status.scan_count,
            event_count: status.event_count,
            result_count: status.result_count,
            job_id: job_id.to_string(),
        }
    }
}

/// Everything a finished search hands back to the orchestrator
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub stats: JobStats,
    /// Path (relative to the web UI) showing the job's results
    pub results_link: String,
    pub results: Vec<ResultRow>,
}

impl SearchOutcome {
    pub fn new(job_id: &str, status: &JobStatus, results: Vec<ResultRow>) -> Self {
        Self {
            stats: JobStats::from_status(job_id, status),
            results_link: job_link(job_id),
            results,
        }
    }
}

/// Web UI path for a search job
pub fn job_link(job_id: &str) -> String {
    format!("/app/search/search?sid={}", job_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_mapping() {
        assert_eq!(BackendHealth::from_status("green"), BackendHealth::Healthy);
        assert_eq!(BackendHealth::from_status("yellow"), BackendHealth::Degraded);
        assert!(BackendHealth::from_status("yellow").is_acceptable());

        let red = BackendHealth::from_status("red");
        assert!(!red.is_acceptable());
        assert_eq!(red.to_string(), "red");
    }

    #[test]
    fn test_stats_from_status() {
        let status = JobStatus {
            is_done: true,
            done_progress: 1.0,
            scan_count: 120,
            event_count: 40,
            result_count: 3,
            ..Default::default()
        };

        let outcome = SearchOutcome::new("1700000000.42", &status, Vec::new());
        assert_eq!(outcome.stats.done_progress, 100.0);
        assert_eq!(outcome.stats.result_count, 3);
        assert_eq!(outcome.results_link, "/app/search/search?sid=1700000000.42");

        let json = serde_json::to_value(&outcome.stats).unwrap();
        assert_eq!(json["jobId"], "1700000000.42");
        assert_eq!(json["scanCount"], 120);
    }
}
