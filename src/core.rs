//! Core domain types and service traits for NoiseWatch
//!
//! This module defines the fundamental data structures and trait contracts
//! that govern component interactions throughout the application.

use crate::context::RunContext;
use crate::reputation::LookupError;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A candidate address extracted from a log line. It is not validated as an IP.
pub type Address = String;

/// Reputation data for a single address, as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EnrichmentRecord {
    /// The address that was looked up
    pub address: Address,
    /// Whether the provider has observed this address scanning the internet
    pub is_noise: bool,
    /// Whether the address belongs to a known benign service (RIOT dataset)
    pub is_riot: bool,
    /// Provider classification, e.g. "malicious" or "benign"
    pub classification: String,
    /// Actor or organisation associated with the address
    pub actor_name: String,
    /// Link to the provider's visualizer page for the address
    pub reference_link: String,
    /// Date the provider last observed the address
    pub last_seen: String,
}

/// Aggregated statistics over one run's enrichment records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SummaryResult {
    /// Number of records flagged as noise
    pub noisy_count: usize,
    /// Number of records not flagged as noise
    pub non_noisy_count: usize,
    /// Reserved. `summarize` never populates it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_noisy_ips: Vec<String>,
    /// Up to two most frequent classifications among noisy records
    pub top_classifications: Vec<String>,
    /// Up to two most frequent actor names among noisy records
    pub top_actor_names: Vec<String>,
}

/// The outcome of a complete run: the summary plus the accounting needed to
/// tell "not noisy" apart from "never answered".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RunReport {
    pub summary: SummaryResult,
    /// Number of unique addresses extracted from the logs
    pub addresses_scanned: usize,
    /// Lookups that completed with an error and were dropped
    pub failed_lookups: usize,
    /// Addresses never looked up because the deadline fired first
    pub unprocessed: usize,
    /// Age window, in days, used when scanning
    pub max_age_days: u32,
}

// =============================================================================
// Service Traits
// =============================================================================

/// Looks up the reputation of a single address
#[async_trait]
pub trait ReputationLookup: Send + Sync {
    /// Retrieves reputation data for an address
    ///
    /// # Arguments
    /// * `ctx` - Cancellation and deadline signal for the whole run
    /// * `address` - The address to look up
    ///
    /// # Returns
    /// * `Ok(EnrichmentRecord)` when the provider answered with a valid body
    /// * `Err(LookupError)` for any HTTP, transport, decode or cancellation failure
    async fn lookup(&self, ctx: &RunContext, address: &str)
        -> Result<EnrichmentRecord, LookupError>;
}

/// Delivers a finished run report to some destination
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A unique, descriptive name for the notifier (e.g., "webhook", "email").
    /// Used for logging.
    fn name(&self) -> &str;

    /// Sends the formatted report
    ///
    /// # Returns
    /// * `Ok(())` if the report was delivered
    /// * `Err` if delivery failed (network error, rejected payload, etc.)
    async fn notify(&self, report: &RunReport) -> Result<()>;
}
