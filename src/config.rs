//! Configuration Module
//!
//! Optional limits for an [`crate::ExpiringCache`], loadable from the
//! environment or any serde format.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

pub const MAX_ITEMS_VAR: &str = "EXPIRY_CACHE_MAX_ITEMS";
pub const MAX_EVICTIONS_PER_SWEEP_VAR: &str = "EXPIRY_CACHE_MAX_EVICTIONS_PER_SWEEP";

/// Cache configuration parameters.
///
/// Every limit is optional; the default configuration imposes none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Soft capacity. Not enforced: a put past it succeeds and logs a warning
    pub max_items: Option<usize>,
    /// Upper bound on keys collected by one eviction sweep
    pub max_evictions_per_sweep: Option<usize>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `EXPIRY_CACHE_MAX_ITEMS` - Soft capacity (default: unset)
    /// - `EXPIRY_CACHE_MAX_EVICTIONS_PER_SWEEP` - Per-sweep cap (default: unset)
    pub fn from_env() -> Result<Self> {
        let config = Self {
            max_items: read_limit(MAX_ITEMS_VAR)?,
            max_evictions_per_sweep: read_limit(MAX_EVICTIONS_PER_SWEEP_VAR)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn with_max_evictions_per_sweep(mut self, max: usize) -> Self {
        self.max_evictions_per_sweep = Some(max);
        self
    }

    /// Rejects limits of zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_items == Some(0) {
            return Err(ConfigError::ZeroLimit("max_items"));
        }
        if self.max_evictions_per_sweep == Some(0) {
            return Err(ConfigError::ZeroLimit("max_evictions_per_sweep"));
        }
        Ok(())
    }
}

fn read_limit(var: &'static str) -> Result<Option<usize>> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
        Err(_) => Ok(None),
    }
}
