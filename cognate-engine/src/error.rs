//! Layered error types
//!
//! Vector and grouping failures come from `cognate-core`; this layer adds
//! validation, persistence and lookup failures raised while the hierarchy is
//! being refined.

use cognate_core::VectorError;
use thiserror::Error;

/// Failures reported by a persistence backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// The backend refused the write
    #[error("backend rejected {key}: {reason}")]
    Rejected {
        /// Entity the write was for
        key: String,
        /// Backend-supplied reason
        reason: String,
    },

    /// The record could not be serialized
    #[error("failed to serialize {key}: {reason}")]
    Serialization {
        /// Entity the write was for
        key: String,
        /// Serializer message
        reason: String,
    },
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Vector codec error
    #[error(transparent)]
    Vector(#[from] VectorError),

    /// An entity failed schema validation or an operation precondition
    #[error("validation failed: {0}")]
    Validation(String),

    /// The persistence backend failed; the failing entity was reverted
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    /// A handle does not name a live entity
    #[error("{kind} {id} not found")]
    NotFound {
        /// Entity kind, e.g. `"cluster"`
        kind: &'static str,
        /// Numeric handle
        id: u32,
    },

    /// Configuration error
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// Project file could not be read or written
    #[error("project I/O error: {0}")]
    IoError(String),
}

impl EngineError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }

    pub(crate) fn not_found(kind: &'static str, id: u32) -> Self {
        EngineError::NotFound { kind, id }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
