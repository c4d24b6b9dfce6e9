//! Configuration management for NoiseWatch
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to load configuration from a `noisewatch.toml` file and merge it
//! with environment variables and command-line arguments.

use crate::cli::Cli;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "noisewatch.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Which log files to read.
    pub scan: ScanConfig,
    /// Access to the reputation provider.
    pub greynoise: GreyNoiseConfig,
    /// Worker pool and deadline settings.
    pub enrichment: EnrichmentConfig,
    /// Where the finished report goes.
    pub output: OutputConfig,
}

/// Which log files to read.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ScanConfig {
    /// Directory holding the log files. Must be an absolute path.
    pub directory: Option<PathBuf>,
    /// Only files created within this many days are read.
    pub max_age_days: u32,
}

/// Access to the GreyNoise community API.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GreyNoiseConfig {
    /// API key sent in the `key` header.
    pub api_key: String,
    /// Scheme and host of the API.
    pub base_url: String,
    /// Idle connections kept in the pool.
    pub max_idle_connections: usize,
    /// How long an idle connection is kept, in seconds.
    pub idle_timeout_seconds: u64,
}

impl Default for GreyNoiseConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.greynoise.io".to_string(),
            max_idle_connections: 10,
            idle_timeout_seconds: 30,
        }
    }
}

/// Worker pool and deadline settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EnrichmentConfig {
    /// Number of concurrent lookups.
    pub workers: usize,
    /// Deadline for the whole enrichment phase, in milliseconds.
    pub deadline_ms: u64,
    /// Capacity of the work queue between producer and workers.
    pub queue_capacity: usize,
}

impl EnrichmentConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            deadline_ms: 4_000,
            queue_capacity: 1,
        }
    }
}

/// Where the finished report goes.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct OutputConfig {
    /// Print the report as JSON instead of plain text.
    #[serde(default)]
    pub json: bool,
    /// Send the report to the configured webhook.
    #[serde(default)]
    pub send_webhook: bool,
    /// Send the report by email.
    #[serde(default)]
    pub send_email: bool,
    pub webhook: Option<WebhookConfig>,
    pub email: Option<EmailConfig>,
}

/// Configuration for webhook delivery.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WebhookConfig {
    /// The webhook URL.
    pub url: String,
    /// JSON field that carries the message text.
    #[serde(default = "default_text_field")]
    pub text_field: String,
    /// Extra JSON object merged into the payload. Single quotes are accepted
    /// in place of double quotes.
    #[serde(default)]
    pub extra_data: Option<String>,
}

fn default_text_field() -> String {
    "text".to_string()
}

/// Configuration for SMTP delivery.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmailConfig {
    pub username: String,
    pub password: String,
    pub server: String,
    pub port: u16,
    pub recipient: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    /// How the SMTP connection is secured.
    #[serde(default)]
    pub tls: SmtpSecurity,
}

/// Transport security for SMTP delivery.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Connect in plaintext and upgrade with STARTTLS (usually port 587).
    #[default]
    Starttls,
    /// TLS from the first byte (usually port 465).
    Wrapper,
    /// No encryption at all.
    #[serde(alias = "none")]
    Plain,
}

fn default_subject() -> String {
    "NoiseWatch report".to_string()
}

impl Config {
    /// Loads the application configuration by layering sources: defaults,
    /// the TOML file, `NOISEWATCH_` environment variables and finally CLI
    /// arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // e.g. NOISEWATCH_GREYNOISE__API_KEY=...
            .merge(Env::prefixed("NOISEWATCH_").split("__"))
            .merge(cli)
            .extract()?;
        Ok(config)
    }

    /// Checks the settings a run cannot start without.
    pub fn validate(&self) -> Result<()> {
        let directory = match &self.scan.directory {
            Some(dir) => dir,
            None => bail!("directory must be present"),
        };
        if !Path::is_absolute(directory) {
            bail!("directory must be an absolute path: {}", directory.display());
        }
        if self.greynoise.api_key.trim().is_empty() {
            bail!("no API key for GreyNoise present");
        }
        if self.enrichment.workers == 0 {
            bail!("enrichment.workers must be at least 1");
        }
        if self.enrichment.deadline_ms == 0 {
            bail!("enrichment.deadline_ms must be greater than 0");
        }
        if self.output.send_webhook && self.output.webhook.is_none() {
            bail!("webhook delivery requested but no [output.webhook] section configured");
        }
        if self.output.send_email && self.output.email.is_none() {
            bail!("email delivery requested but no [output.email] section configured");
        }
        Ok(())
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            scan: ScanConfig {
                directory: None,
                max_age_days: 30,
            },
            greynoise: GreyNoiseConfig::default(),
            enrichment: EnrichmentConfig::default(),
            output: OutputConfig::default(),
        }
    }
}
