#![allow(dead_code)]
//! A fake reputation lookup for testing the pool and the app.

use async_trait::async_trait;
use noisewatch::context::RunContext;
use noisewatch::core::{EnrichmentRecord, ReputationLookup};
use noisewatch::reputation::LookupError;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct FakeReputationLookup {
    delay: Option<Duration>,
    fail_for: HashSet<String>,
    panic_for: HashSet<String>,
    noisy: HashSet<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl FakeReputationLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup sleeps this long before answering. The sleep does not
    /// watch the context.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_for<I: IntoIterator<Item = String>>(mut self, addresses: I) -> Self {
        self.fail_for.extend(addresses);
        self
    }

    pub fn panicking_for(mut self, address: &str) -> Self {
        self.panic_for.insert(address.to_string());
        self
    }

    pub fn noisy_for<I: IntoIterator<Item = String>>(mut self, addresses: I) -> Self {
        self.noisy.extend(addresses);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReputationLookup for FakeReputationLookup {
    async fn lookup(
        &self,
        _ctx: &RunContext,
        address: &str,
    ) -> Result<EnrichmentRecord, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(address.to_string());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic_for.contains(address) {
            panic!("fake lookup configured to panic for {address}");
        }
        if self.fail_for.contains(address) {
            return Err(LookupError::RateLimited);
        }

        let is_noise = self.noisy.contains(address);
        Ok(EnrichmentRecord {
            address: address.to_string(),
            is_noise,
            classification: if is_noise { "malicious" } else { "unknown" }.to_string(),
            actor_name: if is_noise { "unknown" } else { "" }.to_string(),
            ..Default::default()
        })
    }
}
