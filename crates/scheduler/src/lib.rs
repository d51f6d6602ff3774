//! Run Orchestrator
//!
//! Executes every saved search tagged with a schedule keyword, applies the
//! suppression policy to each result row, dispatches alerts and aggregates
//! the outcome into a [`RunReport`].

mod clock;
mod orchestrator;
mod report;

pub use clock::{Clock, SystemClock};
pub use orchestrator::{abort_run, RunOrchestrator};
pub use report::{JobInfo, ResultCounts, RuleResult, RuleStatus, RunReport, RunStatus, REPORT_TARGET};

use thiserror::Error;

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("splunk is not reachable: {0}")]
    BackendUnreachable(#[source] search::SearchError),
    #[error("could not list saved searches: {0}")]
    RuleListing(#[source] search::SearchError),
    #[error("storage query failed: {0}")]
    Storage(#[from] storage::StorageError),
}

impl SchedulerError {
    /// Short reason used in the run status and the failure alert
    pub fn reason(&self) -> &'static str {
        match self {
            SchedulerError::BackendUnreachable(_) => "splunk is not reachable",
            SchedulerError::RuleListing(_) => "could not list saved searches",
            SchedulerError::Storage(_) => "storage query failed",
        }
    }

    /// Underlying error text
    pub fn detail(&self) -> String {
        match self {
            SchedulerError::BackendUnreachable(e) | SchedulerError::RuleListing(e) => e.to_string(),
            SchedulerError::Storage(e) => e.to_string(),
        }
    }
}
