//! cardio-monitor - patient record monitor.
//!
//! Reads measurement records from a directory or stdin, evaluates every
//! patient and delivers the resulting alerts to the log and, optionally, a
//! JSON lines file.

use cardio_monitor::{init_tracing, run, Cli};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    info!(version = env!("CARGO_PKG_VERSION"), "starting cardio-monitor");

    let summary = run(&cli).await?;
    if summary.repeat_firings > 0 {
        info!(firings = summary.repeat_firings, "repeat schedules completed");
    }
    Ok(())
}
