//! Backend Trait and Job Polling

use crate::error::SearchError;
use crate::job::{BackendHealth, JobStatus, SearchOutcome};
use crate::rule::SavedSearch;
use crate::ResultRow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Operations the orchestrator needs from a search backend
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Current server health
    async fn health(&self) -> Result<BackendHealth, SearchError>;

    /// Every saved search visible to the configured user and app
    async fn saved_searches(&self) -> Result<Vec<SavedSearch>, SearchError>;

    /// Submit a search job and return its id
    async fn create_job(&self, query: &str) -> Result<String, SearchError>;

    /// Poll a job's progress
    async fn job_status(&self, sid: &str) -> Result<JobStatus, SearchError>;

    /// Fetch all result rows of a finished job
    async fn job_results(&self, sid: &str) -> Result<Vec<ResultRow>, SearchError>;
}

/// Shortest wait between two status checks
const MIN_DELAY_MS: u64 = 1;

/// Backoff settings for waiting on a search job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// First wait between status checks (milliseconds)
    pub initial_delay_ms: u64,
    /// Upper bound for a single wait (milliseconds)
    pub max_delay_ms: u64,
    /// Growth factor applied after each unfinished check
    pub factor: f64,
    /// Give up on a job after this long (seconds)
    pub timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 250,
            max_delay_ms: 5000,
            factor: 2.0,
            timeout_secs: 600,
        }
    }
}

impl PollConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// First wait, never below one millisecond
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms.clamp(MIN_DELAY_MS, self.cap_ms()))
    }

    /// Wait to use after `current`, between one millisecond and the maximum delay
    pub fn next_delay(&self, current: Duration) -> Duration {
        let cap = self.cap_ms();
        // NaN and infinite factors fall back to the bounds
        let grown = current.as_millis() as f64 * self.factor.max(1.0);
        let ms = grown.min(cap as f64).max(MIN_DELAY_MS as f64);
        Duration::from_millis(ms as u64)
    }

    fn cap_ms(&self) -> u64 {
        self.max_delay_ms.max(MIN_DELAY_MS)
    }
}

/// Run `query` as a job, wait for it to finish and collect its results
pub async fn run_search<B>(
    backend: &B,
    query: &str,
    poll: &PollConfig,
) -> Result<SearchOutcome, SearchError>
where
    B: SearchBackend + ?Sized,
{
    let sid = backend.create_job(query).await?;
    debug!("Created search job {} for '{}'", sid, query);

    let started = Instant::now();
    let mut delay = poll.initial_delay();

    let status = loop {
        let status = backend.job_status(&sid).await?;
        if status.is_failed {
            return Err(SearchError::JobFailed {
                sid,
                reason: status.messages.join("; "),
            });
        }
        if status.is_done {
            break status;
        }

        let elapsed = started.elapsed();
        if elapsed >= poll.timeout() {
            return Err(SearchError::Timeout {
                sid,
                after: poll.timeout(),
            });
        }

        debug!(
            "Job {} at {:.0}%, next check in {:?}",
            sid,
            status.done_progress * 100.0,
            delay
        );
        tokio::time::sleep(delay.min(poll.timeout() - elapsed)).await;
        delay = poll.next_delay(delay);
    };

    let results = backend.job_results(&sid).await?;
    debug!("Job {} returned {} row(s)", sid, results.len());

    Ok(SearchOutcome::new(&sid, &status, results))
}
