//! Error types for the key-value medium.

use thiserror::Error;

/// Errors a [`Medium`](super::Medium) can report.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Existing variants will not be removed in minor versions
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum MediumError {
    /// The write would push the medium past its size limit.
    #[error("Quota exceeded writing '{key}': {required} bytes needed, limit is {limit}")]
    QuotaExceeded {
        /// Key being written
        key: String,
        /// Total size the medium would hold after the write
        required: usize,
        /// The medium's size limit
        limit: usize,
    },

    /// The medium refused access entirely (disabled, locked, private mode).
    #[error("Storage unavailable: {reason}")]
    Unavailable {
        /// Description of why the medium is unavailable
        reason: String,
    },
}

impl MediumError {
    /// Check if this error is a size-limit rejection.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, MediumError::QuotaExceeded { .. })
    }

    /// Check if the medium is unavailable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, MediumError::Unavailable { .. })
    }
}
