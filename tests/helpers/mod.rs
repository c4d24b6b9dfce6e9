pub mod fake_reputation;
pub mod recording_notifier;

use noisewatch::Address;
use std::collections::HashSet;

/// Builds `count` distinct documentation-range addresses.
pub fn addresses(count: usize) -> HashSet<Address> {
    (0..count)
        .map(|i| format!("198.51.{}.{}", i / 256, i % 256))
        .collect()
}
