//! Error types for the expiry cache
//!
//! The cache operations themselves cannot fail; errors only arise while
//! building a configuration.

use thiserror::Error;

// == Config Error Enum ==
/// Error raised while loading or validating a [`crate::CacheConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Environment variable holds something that is not a positive integer
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    /// A limit was set to zero
    #[error("Limit must be greater than zero: {0}")]
    ZeroLimit(&'static str),
}

// == Result Type Alias ==
/// Convenience Result type for configuration loading.
pub type Result<T> = std::result::Result<T, ConfigError>;
