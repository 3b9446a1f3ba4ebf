//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::Parser;

/// cardio-monitor - evaluate patient records and deliver alerts.
///
/// Reads `patientId,timestampMs,signalType,value` lines from every file in
/// a directory, or streams them from stdin, and raises alerts as they are
/// evaluated.
#[derive(Parser, Debug, Clone)]
#[command(name = "cardio-monitor")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory of record files to read. Reads stdin when omitted.
    #[arg(short, long, env = "CARDIO_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// JSON configuration file for the alert manager.
    #[arg(short, long, env = "CARDIO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Append delivered alerts to this file as JSON lines.
    #[arg(short = 'o', long, env = "CARDIO_ALERTS_OUT")]
    pub alerts_out: Option<PathBuf>,

    /// Priority attached to every alert, overriding the config file.
    #[arg(short, long)]
    pub priority: Option<i32>,

    /// Let repeat schedules run to completion before exiting.
    #[arg(long)]
    pub wait_repeats: bool,

    /// Emit logs as JSON.
    #[arg(long, env = "CARDIO_JSON_LOGS")]
    pub json_logs: bool,
}
