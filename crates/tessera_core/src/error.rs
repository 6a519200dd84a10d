//! # Storage Error Types
//!
//! Table operations never fail at runtime: precondition violations are
//! assertions and expected absence is a `bool` or `Option`. The only
//! fallible surface is table configuration.

use thiserror::Error;

/// Errors raised while configuring component storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A page size is zero or not a power of two.
    #[error("invalid {kind} page size {size}: must be a non-zero power of two")]
    InvalidPageSize {
        /// Which page size was rejected (`"entity"` or `"component"`).
        kind: &'static str,
        /// The rejected value.
        size: usize,
    },

    /// The configuration source could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for storage configuration.
pub type StorageResult<T> = Result<T, StorageError>;
