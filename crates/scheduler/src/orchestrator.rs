//! Run Orchestrator Implementation

use crate::clock::{Clock, SystemClock};
use crate::report::{JobInfo, ResultCounts, RuleResult, RunReport, RunStatus};
use crate::SchedulerError;
use alerting::{value_text, AlertDispatcher, Notifier};
use search::{run_search, savedsearch_query, PollConfig, SavedSearch, SearchBackend};
use serde_json::{json, Map, Value};
use storage::{StorageError, SuppressionStore};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Drilldown path for run-level alerts (failures, health warnings)
const ADMIN_PATH: &str = "/app/search";

/// Executes the rules of one schedule keyword against a backend
pub struct RunOrchestrator<B, N> {
    backend: B,
    dispatcher: AlertDispatcher<N>,
    store: SuppressionStore,
    poll: PollConfig,
    clock: Box<dyn Clock>,
}

impl<B, N> RunOrchestrator<B, N>
where
    B: SearchBackend,
    N: Notifier,
{
    pub fn new(
        backend: B,
        dispatcher: AlertDispatcher<N>,
        store: SuppressionStore,
        poll: PollConfig,
    ) -> Self {
        Self {
            backend,
            dispatcher,
            store,
            poll,
            clock: Box::new(SystemClock),
        }
    }

    /// Replace the wall clock used for rule start times
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn dispatcher(&self) -> &AlertDispatcher<N> {
        &self.dispatcher
    }

    pub fn store(&self) -> &SuppressionStore {
        &self.store
    }

    /// Run every rule scheduled for `report.schedule` and fill in the report.
    ///
    /// On error the report is already marked failed and a failure alert was
    /// attempted; the caller only has to emit the report and exit.
    pub async fn run(&self, report: &mut RunReport) -> Result<(), SchedulerError> {
        let span = info_span!("run", run_id = %report.run_id, schedule = %report.schedule);

        async {
            match self.execute(report).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    abort_run(report, Some(&self.dispatcher), e.reason(), &e.detail()).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, report: &mut RunReport) -> Result<(), SchedulerError> {
        self.check_backend(report).await?;

        info!(
            "Fetching saved searches part of schedule '{}'",
            report.schedule
        );
        let rules = self
            .backend
            .saved_searches()
            .await
            .map_err(SchedulerError::RuleListing)?;

        let schedule = report.schedule.clone();
        let mut executed = 0usize;
        for rule in rules.iter().filter(|r| r.is_scheduled_for(&schedule)) {
            debug!("Running rule '{}'", rule.name);
            if self.run_rule(rule, report).await? {
                executed += 1;
            }
        }

        self.finalize(report, executed).await;
        Ok(())
    }

    async fn check_backend(&self, report: &mut RunReport) -> Result<(), SchedulerError> {
        let health = self
            .backend
            .health()
            .await
            .map_err(SchedulerError::BackendUnreachable)?;
        report.backend_health = Some(health.to_string());

        if !health.is_acceptable() {
            warn!("Backend health is {}", health);
            let row = status_row("warning");
            let title = format!("MONIT: health info is {}", health);
            if let Err(e) = self
                .dispatcher
                .dispatch(&title, &row, Some(ADMIN_PATH), None)
                .await
            {
                warn!("Could not send health warning: {}", e);
            }
        }
        Ok(())
    }

    /// Execute one rule and append its result. Returns whether the search ran.
    async fn run_rule(
        &self,
        rule: &SavedSearch,
        report: &mut RunReport,
    ) -> Result<bool, SchedulerError> {
        let started = self.clock.now();
        let mut result = RuleResult::new(&rule.name);

        let outcome = match run_search(&self.backend, &savedsearch_query(rule), &self.poll).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("'{}': {}", rule.name, e);
                result.fail(format!("ERROR: executing rule: {}", e));
                result.finish(started, self.clock.now());
                report.rules.push(result);
                return Ok(false);
            }
        };

        let rows: Vec<&Map<String, Value>> =
            outcome.results.iter().filter_map(Value::as_object).collect();
        let mut counts = ResultCounts {
            total: rows.len() as u32,
            ..Default::default()
        };
        result.job = Some(JobInfo {
            link: outcome.results_link.clone(),
            stats: outcome.stats.clone(),
        });

        // Every row of this execution shares the rule's start time and deadline
        let at = started.floor() as i64;

        let alerted = if rule.notifies() {
            self.alert_rows(rule, &rows, &outcome.results_link, at, &mut counts, &mut result)
                .await
        } else {
            Ok(())
        };
        let stored = match alerted {
            Ok(()) => self.store.cleanup(at).await.map(|_| ()),
            Err(e) => Err(e),
        };

        // Partial counts stay in the report even when storage fails
        result.results = Some(counts);
        result.finish(started, self.clock.now());
        report.rules.push(result);

        stored?;
        Ok(true)
    }

    /// Apply the suppression policy to each row and dispatch what remains
    async fn alert_rows(
        &self,
        rule: &SavedSearch,
        rows: &[&Map<String, Value>],
        results_link: &str,
        at: i64,
        counts: &mut ResultCounts,
        result: &mut RuleResult,
    ) -> Result<(), StorageError> {
        for row in rows {
            if let Some(field) = rule.suppress_field.as_deref() {
                let value = row.get(field).map(value_text).unwrap_or_default();
                if self.store.should_suppress(&rule.name, &value, at).await? {
                    counts.suppressed += 1;
                    continue;
                }
                if !value.is_empty() {
                    self.store
                        .add_suppression(&rule.name, &value, at + rule.suppress_seconds())
                        .await?;
                }
            }

            match self
                .dispatcher
                .dispatch(
                    &rule.name,
                    row,
                    Some(results_link),
                    rule.output_fields.as_deref(),
                )
                .await
            {
                Ok(receiver) => {
                    counts.success += 1;
                    debug!("'{}': alert sent to {}", rule.name, receiver);
                }
                Err(e) => {
                    counts.failure += 1;
                    let message = format!("ERROR while sending alert: {}", e);
                    warn!("'{}': {}", rule.name, message);
                    result.messages.push(message);
                }
            }
        }
        Ok(())
    }

    async fn finalize(&self, report: &mut RunReport, executed: usize) {
        if executed > 0 {
            info!("{} rule(s) were run successfully", executed);
            report.run_status = RunStatus::Success;
        } else if report.attempted() > 0 {
            abort_run(
                report,
                Some(&self.dispatcher),
                "All rules failed to be executed",
                "",
            )
            .await;
        } else {
            info!("No rule has been run");
            report.run_status = RunStatus::NoOp;
        }
    }
}

/// Mark the run failed and, when a channel is available, send a failure alert.
///
/// Delivery of the alert is best effort.
pub async fn abort_run<N: Notifier>(
    report: &mut RunReport,
    dispatcher: Option<&AlertDispatcher<N>>,
    reason: &str,
    detail: &str,
) {
    report.run_status = RunStatus::failed(reason, detail);
    error!("{}", report.run_status);

    if let Some(dispatcher) = dispatcher {
        let title = format!("ERROR: {}", reason);
        if let Err(e) = dispatcher
            .dispatch(&title, &status_row("error"), Some(ADMIN_PATH), None)
            .await
        {
            warn!("Could not send failure alert: {}", e);
        }
    }
}

fn status_row(status: &str) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("status".to_string(), json!(status));
    row
}
