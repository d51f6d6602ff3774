//! Process-wide JSON logging

use crate::config::LoggingConfig;
use anyhow::{anyhow, Context, Result};
use scheduler::REPORT_TARGET;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the configured level,
/// but never hides the run report.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let writer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    let filter = log_filter(std::env::var("RUST_LOG").ok().as_deref(), config)?;
    tracing::subscriber::set_global_default(json_subscriber(filter, writer))
        .map_err(|e| anyhow!("Failed to set tracing subscriber: {}", e))
}

fn json_subscriber(filter: EnvFilter, writer: BoxMakeWriter) -> impl Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false)
        .json()
        .finish()
}

/// Level filter from `RUST_LOG` if set, else from the config, plus the report target
fn log_filter(rust_log: Option<&str>, config: &LoggingConfig) -> Result<EnvFilter> {
    let filter = rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level(config)));

    Ok(filter.add_directive(format!("{}=info", REPORT_TARGET).parse()?))
}

fn default_level(config: &LoggingConfig) -> &'static str {
    if config.debug {
        "debug"
    } else {
        "info"
    }
}
