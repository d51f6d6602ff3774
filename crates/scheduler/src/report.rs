//! Run Report Types

use crate::clock::round_ms;
use search::JobStats;
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::info;
use uuid::Uuid;

/// Tracing target the run report is emitted on
pub const REPORT_TARGET: &str = "splasch::report";

/// Overall outcome of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// No rule matched the schedule keyword
    NoOp,
    /// Run aborted, or no matching rule could be executed
    Failed { reason: String, detail: String },
}

impl RunStatus {
    pub fn failed(reason: impl Into<String>, detail: impl Into<String>) -> Self {
        RunStatus::Failed {
            reason: reason.into(),
            detail: detail.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RunStatus::Failed { .. })
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => f.write_str("success"),
            RunStatus::NoOp => f.write_str("noop"),
            RunStatus::Failed { reason, detail } if detail.is_empty() => {
                write!(f, "ERROR: {}", reason)
            }
            RunStatus::Failed { reason, detail } => write!(f, "ERROR: {}: {}", reason, detail),
        }
    }
}

impl Serialize for RunStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Success,
    Failure,
}

/// Per-row outcome counters for one rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultCounts {
    pub success: u32,
    pub failure: u32,
    /// Always zero; no row outcome is classed as a warning
    pub warning: u32,
    pub suppressed: u32,
    /// Record rows returned by the search
    pub total: u32,
}

/// The search job behind a rule execution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobInfo {
    pub link: String,
    pub stats: JobStats,
}

/// What happened to one rule during a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleResult {
    pub name: String,
    /// Seconds spent on the rule
    pub run_time: f64,
    pub status: RuleStatus,
    pub messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ResultCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobInfo>,
}

impl RuleResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run_time: 0.0,
            status: RuleStatus::Success,
            messages: Vec::new(),
            results: None,
            job: None,
        }
    }

    /// Mark the rule failed with a message
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = RuleStatus::Failure;
        self.messages.push(message.into());
    }

    /// Record elapsed time between `started` and `finished` (epoch seconds)
    pub fn finish(&mut self, started: f64, finished: f64) {
        self.run_time = round_ms((finished - started).max(0.0));
    }

    pub fn counts(&self) -> ResultCounts {
        self.results.clone().unwrap_or_default()
    }
}

/// Structured record of one invocation, emitted once at the end
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run start, epoch seconds
    pub time: f64,
    pub run_id: Uuid,
    pub schedule: String,
    pub run_status: RunStatus,
    #[serde(rename = "splunk_health", skip_serializing_if = "Option::is_none")]
    pub backend_health: Option<String>,
    pub rules: Vec<RuleResult>,
}

impl RunReport {
    pub fn new(schedule: impl Into<String>, time: f64) -> Self {
        Self {
            time: round_ms(time),
            run_id: Uuid::new_v4(),
            schedule: schedule.into(),
            run_status: RunStatus::Success,
            backend_health: None,
            rules: Vec::new(),
        }
    }

    /// Rules that were attempted, whether or not they ran
    pub fn attempted(&self) -> usize {
        self.rules.len()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                "{{\"run_id\":\"{}\",\"run_status\":\"report serialization failed: {}\"}}",
                self.run_id, e
            )
        })
    }

    /// Write the report to the report target. Call exactly once per run.
    pub fn emit(&self) {
        info!(target: REPORT_TARGET, "{}", self.to_json());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_status_strings() {
        assert_eq!(RunStatus::Success.to_string(), "success");
        assert_eq!(RunStatus::NoOp.to_string(), "noop");
        assert_eq!(
            RunStatus::failed("All rules failed to be executed", "").to_string(),
            "ERROR: All rules failed to be executed"
        );
        assert_eq!(
            RunStatus::failed("could not open database file", "disk I/O error").to_string(),
            "ERROR: could not open database file: disk I/O error"
        );
    }

    #[test]
    fn test_rule_result_serialization() {
        let mut rule = RuleResult::new("R1");
        rule.fail("ERROR: executing rule: HTTP 400");
        rule.finish(1000.0, 1000.25);

        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "R1",
                "run_time": 0.25,
                "status": "failure",
                "messages": ["ERROR: executing rule: HTTP 400"]
            })
        );
    }

    #[test]
    fn test_result_counts_shape() {
        let counts = ResultCounts {
            success: 2,
            suppressed: 1,
            total: 3,
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&counts).unwrap(),
            json!({ "success": 2, "failure": 0, "warning": 0, "suppressed": 1, "total": 3 })
        );
    }

    #[test]
    fn test_report_shape() {
        let mut report = RunReport::new("hourly", 1000.0004);
        report.backend_health = Some("green".into());
        report.rules.push(RuleResult::new("R1"));

        let value: serde_json::Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(value["time"], 1000.0);
        assert_eq!(value["schedule"], "hourly");
        assert_eq!(value["run_status"], "success");
        assert_eq!(value["splunk_health"], "green");
        assert_eq!(value["rules"][0]["name"], "R1");
        assert_eq!(value["run_id"], report.run_id.to_string());
        assert_eq!(report.attempted(), 1);
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunReport::new("h", 0.0).run_id, RunReport::new("h", 0.0).run_id);
    }
}
