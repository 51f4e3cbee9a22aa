//! Cache Module
//!
//! Provides the expiring cache together with its expiry-ordered index.

mod encoding;
mod entry;
mod index;
mod stats;
mod store;
mod sweep;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use encoding::{is_expired, ExpiryKey, ENCODED_LEN};
pub use entry::CacheEntry;
pub use index::{BTreeIndex, OrderedIndex};
pub use stats::CacheStats;
pub use store::{ExpiringCache, KeySet};
pub use sweep::{SweepContext, SweepGate, SweepPermit};
