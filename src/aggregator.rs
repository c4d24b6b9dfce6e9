//! Summary statistics over a run's enrichment records.

use crate::core::{EnrichmentRecord, SummaryResult};
use itertools::Itertools;
use std::cmp::Reverse;
use std::collections::HashMap;

/// How many entries the ranked lists keep.
const TOP_N: usize = 2;

/// Counts noisy and non-noisy records and ranks the classifications and actor
/// names seen among the noisy ones.
///
/// The input order does not matter. Ties in the ranking are broken by the
/// key in ascending lexicographic order, so the output is deterministic.
pub fn summarize(records: &[EnrichmentRecord]) -> SummaryResult {
    let mut classifications: HashMap<&str, usize> = HashMap::new();
    let mut actor_names: HashMap<&str, usize> = HashMap::new();
    let mut noisy_count = 0;

    for record in records.iter().filter(|r| r.is_noise) {
        noisy_count += 1;
        *classifications.entry(record.classification.as_str()).or_default() += 1;
        *actor_names.entry(record.actor_name.as_str()).or_default() += 1;
    }

    SummaryResult {
        noisy_count,
        non_noisy_count: records.len() - noisy_count,
        top_noisy_ips: Vec::new(),
        top_classifications: top_values(&classifications, TOP_N),
        top_actor_names: top_values(&actor_names, TOP_N),
    }
}

/// Returns up to `n` keys ordered by descending count, then ascending key.
fn top_values(counts: &HashMap<&str, usize>, n: usize) -> Vec<String> {
    counts
        .iter()
        .sorted_by_key(|(key, count)| (Reverse(**count), **key))
        .take(n)
        .map(|(key, _)| key.to_string())
        .collect()
}
