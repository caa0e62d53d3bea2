//! Error types for the memoization layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Memo Error Enum ==
/// Unified error type for caches and memoized operations.
///
/// Failures raised by the wrapped operation itself are not represented here:
/// they are returned to the caller unchanged and never cached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoError {
    /// Invalid ttl/max_size, unknown operation, or conflicting declaration
    #[error("Configuration error for `{operation}`: {reason}")]
    Configuration { operation: String, reason: String },

    /// Argument vector could not be reduced to a deterministic key
    #[error("Key derivation failed for `{operation}`: {reason}")]
    KeyDerivation { operation: String, reason: String },

    /// Internal cache invariant was violated
    #[error("Cache operation failed for `{operation}`: {reason}")]
    CacheOperation { operation: String, reason: String },
}

impl MemoError {
    // == Constructors ==
    pub fn configuration(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn key_derivation(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::KeyDerivation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn cache_operation(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CacheOperation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    // == Accessors ==
    /// Returns the operation identifier the error refers to.
    pub fn operation(&self) -> &str {
        match self {
            MemoError::Configuration { operation, .. }
            | MemoError::KeyDerivation { operation, .. }
            | MemoError::CacheOperation { operation, .. } => operation,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the memoization layer.
pub type Result<T> = std::result::Result<T, MemoError>;
