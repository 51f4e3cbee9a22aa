//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with an absolute expiry.

use chrono::{DateTime, Duration, Utc};

use crate::cache::encoding::{is_expired, ExpiryKey};

// == Cache Entry ==
/// Represents a single cache entry with its value and expiry instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Instant at which the entry becomes logically absent
    pub expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry expiring at `expires_at`.
    pub fn new(value: V, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    // == Is Expired ==
    /// Checks expiry against an explicit `now`.
    ///
    /// Boundary condition: the entry is expired when `now >= expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_expired(now, self.expires_at)
    }

    /// Checks expiry against the current wall clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    // == Time To Live ==
    /// Returns the time left before expiry, or None once expired.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        let remaining = self.expires_at - Utc::now();
        (remaining > Duration::zero()).then_some(remaining)
    }

    /// Returns the index key of the bucket this entry belongs to.
    pub fn expiry_key(&self) -> ExpiryKey {
        ExpiryKey::encode(self.expires_at)
    }
}
