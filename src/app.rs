//! The main application logic, decoupled from the entry point.

use crate::{
    aggregator::summarize,
    config::Config,
    context::RunContext,
    core::{Notifier, ReputationLookup, RunReport},
    notification::build_notifiers,
    pool::EnrichmentPool,
    reputation::ReputationClient,
    scanner::{LogScanner, PlatformTimestamp, TimestampSource},
};
use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// A fully wired application, ready to scan, enrich and report once.
pub struct App {
    config: Config,
    directory: PathBuf,
    scanner: Arc<LogScanner>,
    lookup: Arc<dyn ReputationLookup>,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scans the log directory, enriches every address found and summarizes
    /// the results.
    ///
    /// Fails if the directory cannot be listed or yields no addresses. Lookup
    /// failures do not fail the run; they are counted in the report.
    #[instrument(skip(self), fields(directory = %self.directory.display()))]
    pub async fn run(&self) -> Result<RunReport> {
        let max_age_days = self.config.scan.max_age_days;

        let scanner = self.scanner.clone();
        let directory = self.directory.clone();
        let addresses = tokio::task::spawn_blocking(move || scanner.scan(&directory, max_age_days))
            .await
            .context("log scanner task failed")??;
        let addresses_scanned = addresses.len();
        info!(addresses = addresses_scanned, "Collected candidate addresses.");

        let (ctx, _cancel) = RunContext::with_timeout(self.config.enrichment.deadline());
        let pool = EnrichmentPool::from_config(self.lookup.clone(), &self.config.enrichment);
        info!(
            workers = pool.workers(),
            deadline_ms = self.config.enrichment.deadline_ms,
            "Starting enrichment."
        );
        let batch = pool
            .run_with_stats(&ctx, addresses)
            .await
            .with_context(|| format!("no IPs parsed from {}", self.directory.display()))?;

        let summary = summarize(&batch.records);
        info!(
            noisy = summary.noisy_count,
            non_noisy = summary.non_noisy_count,
            failed = batch.failed,
            unprocessed = batch.unprocessed,
            "Run summarized."
        );

        Ok(RunReport {
            summary,
            addresses_scanned,
            failed_lookups: batch.failed,
            unprocessed: batch.unprocessed,
            max_age_days,
        })
    }

    /// Hands the report to every enabled notifier. All notifiers are tried;
    /// the call fails if any of them failed.
    pub async fn notify(&self, report: &RunReport) -> Result<()> {
        let results = join_all(self.notifiers.iter().map(|n| async move {
            let outcome = n.notify(report).await;
            (n.name(), outcome)
        }))
        .await;

        let mut failed = Vec::new();
        for (name, outcome) in results {
            if let Err(e) = outcome {
                error!(notifier = name, error = %e, "Failed to deliver report");
                failed.push(name);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("could not deliver report via: {}", failed.join(", ")))
        }
    }
}

/// Builder for the main application.
///
/// Separates constructing the components from running them, and lets tests
/// swap out the lookup, the notifiers or the timestamp source.
pub struct AppBuilder {
    config: Config,
    lookup_override: Option<Arc<dyn ReputationLookup>>,
    notifiers_override: Option<Vec<Box<dyn Notifier>>>,
    timestamps_override: Option<Box<dyn TimestampSource>>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            lookup_override: None,
            notifiers_override: None,
            timestamps_override: None,
        }
    }

    /// Overrides the reputation lookup for testing.
    pub fn lookup_override(mut self, lookup: Arc<dyn ReputationLookup>) -> Self {
        self.lookup_override = Some(lookup);
        self
    }

    /// Overrides the notifiers for testing.
    pub fn notifiers_override(mut self, notifiers: Vec<Box<dyn Notifier>>) -> Self {
        self.notifiers_override = Some(notifiers);
        self
    }

    /// Overrides how file ages are determined.
    pub fn timestamps_override(mut self, timestamps: Box<dyn TimestampSource>) -> Self {
        self.timestamps_override = Some(timestamps);
        self
    }

    /// Validates the configuration and builds all components.
    pub fn build(self) -> Result<App> {
        let config = self.config;
        config.validate()?;
        let directory = config
            .scan
            .directory
            .clone()
            .ok_or_else(|| anyhow!("directory must be present"))?;

        let lookup = match self.lookup_override {
            Some(lookup) => lookup,
            None => Arc::new(
                ReputationClient::new(&config.greynoise)
                    .context("failed to build GreyNoise client")?,
            ) as Arc<dyn ReputationLookup>,
        };

        let notifiers = match self.notifiers_override {
            Some(notifiers) => notifiers,
            None => build_notifiers(&config)?,
        };

        let timestamps = self
            .timestamps_override
            .unwrap_or_else(|| Box::new(PlatformTimestamp));

        Ok(App {
            config,
            directory,
            scanner: Arc::new(LogScanner::new(timestamps)),
            lookup,
            notifiers,
        })
    }
}
