//! Bulk ingestion from line-oriented sources.
//!
//! Every line goes through [`crate::wire::parse_line`]; lines that fail are
//! dropped with a warning and counted, and the rest of the source is still
//! read.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::PatientStore;
use crate::wire::parse_line;

/// Counters for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Lines that became new records.
    pub accepted: usize,
    /// Lines that parsed but duplicated an existing observation.
    pub duplicates: usize,
    /// Lines that failed to parse.
    pub rejected: usize,
}

impl IngestSummary {
    /// Adds another summary's counters to this one.
    pub fn merge(&mut self, other: Self) {
        self.accepted += other.accepted;
        self.duplicates += other.duplicates;
        self.rejected += other.rejected;
    }
}

/// Reads every line of `reader` into the store.
///
/// `source` only labels log output.
///
/// # Errors
///
/// Returns `RecordError::Io` if the underlying reader fails. Parse failures
/// are not errors.
pub fn ingest_lines<R: BufRead>(
    reader: R,
    store: &PatientStore,
    source: &str,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line) {
            Ok(record) => {
                if store.append(record) {
                    summary.accepted += 1;
                } else {
                    summary.duplicates += 1;
                }
            }
            Err(e) => {
                summary.rejected += 1;
                warn!(source, line = index + 1, error = %e, "dropping malformed record");
            }
        }
    }

    debug!(
        source,
        accepted = summary.accepted,
        duplicates = summary.duplicates,
        rejected = summary.rejected,
        "ingested source"
    );
    Ok(summary)
}

/// Reads every file in a directory into a [`PatientStore`].
#[derive(Debug, Clone)]
pub struct DirectoryReader {
    directory: PathBuf,
}

impl DirectoryReader {
    /// Creates a reader for the given directory.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// The directory being read.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Reads all regular files in the directory, in file-name order.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Io` if the directory or a file cannot be read.
    pub fn read_into(&self, store: &PatientStore) -> Result<IngestSummary> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.directory)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        let mut summary = IngestSummary::default();
        for path in &files {
            let file = File::open(path)?;
            let label = path.display().to_string();
            summary.merge(ingest_lines(BufReader::new(file), store, &label)?);
        }

        info!(
            directory = %self.directory.display(),
            files = files.len(),
            accepted = summary.accepted,
            rejected = summary.rejected,
            "finished reading data directory"
        );
        Ok(summary)
    }
}
