//! Error types for the position store.

use thiserror::Error;

use crate::backend::MediumError;

/// Errors from reading or writing the position mapping.
///
/// None of these are fatal: the manager logs them and carries on with an
/// empty mapping or a skipped write.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// Stored content could not be parsed as a position mapping.
    #[error("Corrupt reading position data under '{storage_key}'")]
    CorruptData {
        storage_key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The medium rejected a read or write.
    #[error("Failed to {operation} reading positions under '{storage_key}'")]
    PersistenceFailure {
        storage_key: String,
        /// `read`, `write` or `clear`
        operation: &'static str,
        #[source]
        source: MediumError,
    },

    /// The mapping could not be encoded.
    #[error("Failed to serialize reading positions")]
    SerializationFailed {
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Check if stored content was unparsable.
    pub fn is_corrupt_data(&self) -> bool {
        matches!(self, StoreError::CorruptData { .. })
    }

    /// Check if the medium rejected the operation.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, StoreError::PersistenceFailure { .. })
    }

    /// Check if the medium rejected a write for lack of space.
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            StoreError::PersistenceFailure { source, .. } => source.is_quota_exceeded(),
            _ => false,
        }
    }
}
