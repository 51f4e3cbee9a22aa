//! Expiry Cache - An in-process key-value cache with absolute expiry
//!
//! Entries carry a fixed expiry instant. A secondary index ordered by expiry
//! lets `evict_expired_keys` stop at the first bucket that is still live
//! instead of scanning every entry.

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheStats, ExpiringCache, SweepContext};
pub use config::CacheConfig;
pub use error::ConfigError;
