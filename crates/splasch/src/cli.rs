use clap::Parser;
use std::path::PathBuf;

/// Run the Splunk saved searches tagged with a schedule keyword
#[derive(Debug, Parser)]
#[command(name = "splasch", version, about)]
pub struct Args {
    /// Schedule keyword selecting the rules to run (e.g. `hourly`)
    pub schedule: String,

    /// Configuration file
    #[arg(short, long, default_value = "splasch.toml", env = "SPLASCH_CONFIG")]
    pub config: PathBuf,
}
