//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `noisewatch.toml` file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Reports how many of the hosts in your logs are known internet scanners.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory that contains the log files. Must be an absolute path.
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Parse log files created within the last DAYS days.
    #[arg(long, value_name = "DAYS")]
    pub days: Option<u32>,

    /// Number of concurrent reputation lookups.
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Deadline for the enrichment phase in milliseconds.
    #[arg(long, value_name = "MS")]
    pub deadline_ms: Option<u64>,

    /// Send the result to the configured webhook.
    #[arg(long)]
    pub webhook: bool,

    /// Send the result by email over SMTP.
    #[arg(long)]
    pub smtp: bool,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut scan = Dict::new();
        if let Some(directory) = &self.directory {
            scan.insert(
                "directory".into(),
                Value::from(directory.to_string_lossy().into_owned()),
            );
        }
        if let Some(days) = self.days {
            scan.insert("max_age_days".into(), Value::from(days));
        }

        let mut enrichment = Dict::new();
        if let Some(workers) = self.workers {
            enrichment.insert("workers".into(), Value::from(workers));
        }
        if let Some(deadline_ms) = self.deadline_ms {
            enrichment.insert("deadline_ms".into(), Value::from(deadline_ms));
        }

        // Flags only ever switch an output on; absence leaves the file's value.
        let mut output = Dict::new();
        if self.webhook {
            output.insert("send_webhook".into(), Value::from(true));
        }
        if self.smtp {
            output.insert("send_email".into(), Value::from(true));
        }
        if self.json {
            output.insert("json".into(), Value::from(true));
        }

        let mut dict = Dict::new();
        for (key, section) in [("scan", scan), ("enrichment", enrichment), ("output", output)] {
            if !section.is_empty() {
                dict.insert(key.into(), Value::from(section));
            }
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
