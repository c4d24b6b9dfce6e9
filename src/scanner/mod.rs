//! Extraction of candidate addresses from a directory of log files.
//!
//! Every line of every recent file contributes its first space-delimited
//! token. Results are collected into a set, so an address seen in many lines
//! or many files is looked up once.

pub mod timestamp;

pub use timestamp::{PlatformTimestamp, TimestampSource};

use crate::core::Address;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to list log directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Scans log directories using a pluggable timestamp source.
pub struct LogScanner {
    timestamps: Box<dyn TimestampSource>,
}

impl Default for LogScanner {
    fn default() -> Self {
        Self::new(Box::new(PlatformTimestamp))
    }
}

impl LogScanner {
    pub fn new(timestamps: Box<dyn TimestampSource>) -> Self {
        Self { timestamps }
    }

    /// Collects the unique candidate addresses from every file in `directory`
    /// whose reference timestamp is newer than `max_age_days` days ago.
    ///
    /// Only a failure to list the directory itself is an error. Files that
    /// cannot be inspected or opened are logged and skipped.
    #[instrument(skip(self), fields(directory = %directory.display()))]
    pub fn scan(&self, directory: &Path, max_age_days: u32) -> Result<HashSet<Address>, ScanError> {
        let entries = fs::read_dir(directory).map_err(|source| ScanError::Directory {
            path: directory.to_path_buf(),
            source,
        })?;

        // A window reaching past the representable range admits every file.
        let cutoff = Utc::now()
            .checked_sub_signed(Duration::days(i64::from(max_age_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut addresses = HashSet::new();
        let mut files_read = 0usize;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Failed to read directory entry, skipping.");
                    continue;
                }
            };
            let path = entry.path();

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to stat file, skipping.");
                    continue;
                }
            };
            if !metadata.is_file() {
                debug!(path = %path.display(), "Not a regular file, skipping.");
                continue;
            }

            let timestamp = match self.timestamps.reference_time(&path, &metadata) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read file timestamp, skipping.");
                    continue;
                }
            };
            if timestamp <= cutoff {
                debug!(path = %path.display(), %timestamp, "File is outside the age window.");
                continue;
            }

            let file = match File::open(&path) {
                Ok(file) => file,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to open log file, skipping.");
                    continue;
                }
            };

            files_read += 1;
            extract_addresses(BufReader::new(file), &path, &mut addresses);
        }

        info!(files_read, unique = addresses.len(), "Log scan complete.");
        metrics::gauge!("addresses_scanned").set(addresses.len() as f64);
        Ok(addresses)
    }
}

/// Inserts the leading token of each line of `reader` into `out`.
fn extract_addresses<R: BufRead>(reader: R, path: &Path, out: &mut HashSet<Address>) {
    for line in reader.split(b'\n') {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Read error, ignoring rest of file.");
                return;
            }
        };
        if let Some(token) = leading_token(&line) {
            out.insert(String::from_utf8_lossy(token).into_owned());
        }
    }
}

/// Returns the bytes before the first ASCII space, or the whole line if it
/// has none. Blank lines yield `None`.
fn leading_token(line: &[u8]) -> Option<&[u8]> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let token = match line.iter().position(|&b| b == b' ') {
        Some(end) => &line[..end],
        None => line,
    };
    (!token.is_empty()).then_some(token)
}
