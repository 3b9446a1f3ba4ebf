//! The monitor run loop: load configuration, ingest, evaluate, deliver.

use std::io;
use std::sync::Arc;

use anyhow::Context;
use cardio_alerts::{
    AlertManager, AlertManagerConfig, DeliveryStats, EvaluationResult, JsonLinesSink, LogSink,
};
use cardio_records::{DirectoryReader, IngestSummary, PatientStore};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::Cli;

/// Installs the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` overrides the default `info` level.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(io::stderr)).init();
    }
}

/// What one monitor run did.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Lines read and how they were handled.
    pub ingest: IngestSummary,
    /// Evaluation counters across all patients.
    pub evaluation: EvaluationResult,
    /// Queued deliveries.
    pub delivery: DeliveryStats,
    /// Firings made by repeat schedules that were waited for.
    pub repeat_firings: u32,
}

/// Builds the manager configuration from the config file and flags.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed.
pub fn load_config(cli: &Cli) -> anyhow::Result<AlertManagerConfig> {
    let mut config = match &cli.config {
        Some(path) => AlertManagerConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => AlertManagerConfig::default(),
    };
    if let Some(priority) = cli.priority {
        config.priority = Some(priority);
    }
    Ok(config)
}

/// Runs the monitor to completion.
///
/// # Errors
///
/// Returns an error if the configuration is unusable, the data directory or
/// output file cannot be opened, or an evaluation task fails.
pub async fn run(cli: &Cli) -> anyhow::Result<RunSummary> {
    let config = load_config(cli)?;
    let store = PatientStore::new();
    let (manager, dispatcher) = AlertManager::start(store.clone(), config)?;

    manager.add_sink(Arc::new(LogSink::default()));
    if let Some(path) = &cli.alerts_out {
        let sink = JsonLinesSink::append_to(path)
            .with_context(|| format!("opening {}", path.display()))?;
        manager.add_sink(Arc::new(sink));
    }

    let mut summary = RunSummary::default();
    match &cli.data_dir {
        Some(dir) => {
            summary.ingest = DirectoryReader::new(dir)
                .read_into(&store)
                .with_context(|| format!("reading {}", dir.display()))?;
            summary.evaluation = manager.process_all().await?;
        }
        None => {
            info!("reading records from stdin");
            let (ingest, evaluation) = stream(&manager, tokio::io::stdin()).await?;
            summary.ingest = ingest;
            summary.evaluation = evaluation;
        }
    }

    if cli.wait_repeats {
        summary.repeat_firings = manager.finish_repeats().await?;
    } else {
        manager.cancel_all_repeats();
    }
    summary.delivery = dispatcher.shutdown().await?;

    info!(
        accepted = summary.ingest.accepted,
        duplicates = summary.ingest.duplicates,
        rejected = summary.ingest.rejected,
        patients = store.patient_count(),
        alerts = summary.evaluation.alerts_raised.len(),
        delivered = summary.delivery.delivered,
        failed = summary.delivery.failed,
        "monitor finished"
    );
    Ok(summary)
}

/// Ingests wire lines one at a time, evaluating each patient as its
/// records arrive.
///
/// Malformed lines are logged and counted, never fatal.
///
/// # Errors
///
/// Returns an error only if reading from `reader` fails.
pub async fn stream<R: AsyncRead + Unpin>(
    manager: &AlertManager,
    reader: R,
) -> anyhow::Result<(IngestSummary, EvaluationResult)> {
    let mut lines = BufReader::new(reader).lines();
    let mut ingest = IngestSummary::default();
    let mut evaluation = EvaluationResult::default();
    let mut line_number = 0_usize;

    while let Some(line) = lines.next_line().await.context("reading input")? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        match manager.ingest_line(&line) {
            Ok(result) if result.patients_evaluated == 0 => ingest.duplicates += 1,
            Ok(result) => {
                ingest.accepted += 1;
                evaluation.merge(result);
            }
            Err(e) => {
                ingest.rejected += 1;
                warn!(line = line_number, error = %e, "dropping malformed record");
            }
        }
    }

    Ok((ingest, evaluation))
}
