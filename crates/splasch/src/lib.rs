//! SPLaSCH
//!
//! Runs the Splunk saved searches tagged with a schedule keyword and pushes
//! their result rows as Pushbullet alerts, with per-value suppression windows
//! kept in SQLite. One invocation is one run and ends with one JSON report.

pub mod cli;
pub mod config;
pub mod logging;

pub use cli::Args;
pub use config::Settings;
pub use logging::init_logging;

use alerting::{AlertDispatcher, PushbulletNotifier};
use anyhow::Result;
use scheduler::{abort_run, Clock, RunOrchestrator, RunReport, RunStatus, SystemClock};
use search::SplunkClient;
use std::process::ExitCode;
use storage::SuppressionStore;
use tracing::{info, info_span, Instrument};

type Orchestrator = RunOrchestrator<SplunkClient, PushbulletNotifier>;

/// Exit status for a run that was aborted
const ABORTED: u8 = 1;

/// Exit status for a run that completed, including no-op runs
const COMPLETED: u8 = 0;

/// Load settings, run one schedule and emit its report.
///
/// Every failure is recorded in the report and mapped to the exit code.
/// When settings or logging cannot be set up the report goes to stderr.
pub async fn run(args: Args) -> ExitCode {
    let mut report = RunReport::new(&args.schedule, SystemClock.now());

    let settings = match setup(&args) {
        Ok(settings) => settings,
        Err(e) => {
            setup_failed(&mut report, &e);
            eprintln!("{}", report.to_json());
            return ExitCode::from(ABORTED);
        }
    };

    info!(
        "SPLaSCH v{} starting schedule '{}'",
        env!("CARGO_PKG_VERSION"),
        args.schedule
    );

    let completed = execute(&settings, &mut report).await;
    report.emit();

    ExitCode::from(exit_status(completed))
}

fn setup(args: &Args) -> Result<Settings> {
    let settings = Settings::load(&args.config)?;
    init_logging(&settings.logging)?;
    Ok(settings)
}

fn setup_failed(report: &mut RunReport, err: &anyhow::Error) {
    report.run_status = RunStatus::failed("could not set up the run", format!("{:#}", err));
}

/// Run the preconditions and the orchestrator. Returns false if the run aborted.
pub async fn execute(settings: &Settings, report: &mut RunReport) -> bool {
    let span = info_span!("preconditions", run_id = %report.run_id);
    let Some(orchestrator) = connect(settings, report).instrument(span).await else {
        return false;
    };

    let completed = orchestrator.run(report).await.is_ok();
    orchestrator.store().close().await;
    completed
}

/// Open the notification channel, the suppression store and the backend, in
/// that order. The first failure aborts the run.
async fn connect(settings: &Settings, report: &mut RunReport) -> Option<Orchestrator> {
    let notifier = match PushbulletNotifier::connect(settings.pushbullet.clone()).await {
        Ok(notifier) => notifier,
        Err(e) => {
            abort_run::<PushbulletNotifier>(
                report,
                None,
                "could not connect to pushbullet",
                &e.to_string(),
            )
            .await;
            return None;
        }
    };
    let dispatcher = AlertDispatcher::new(notifier, settings.alert_link.as_str());

    let store = match SuppressionStore::connect(&settings.database.path).await {
        Ok(store) => store,
        Err(e) => {
            abort_run(
                report,
                Some(&dispatcher),
                "could not open database file",
                &e.to_string(),
            )
            .await;
            return None;
        }
    };

    let backend = match SplunkClient::connect(&settings.splunk).await {
        Ok(backend) => backend,
        Err(e) => {
            abort_run(
                report,
                Some(&dispatcher),
                "could not connect to splunk",
                &e.to_string(),
            )
            .await;
            store.close().await;
            return None;
        }
    };

    Some(RunOrchestrator::new(
        backend,
        dispatcher,
        store,
        settings.poll.clone(),
    ))
}

fn exit_status(completed: bool) -> u8 {
    if completed {
        COMPLETED
    } else {
        ABORTED
    }
}
