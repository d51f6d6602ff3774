//! SPLaSCH - Main Entry Point

use clap::Parser;
use splasch::Args;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    splasch::run(args).await
}
