//! Key-value media for persisted reading positions
//!
//! This module provides the [`Medium`] trait and an in-memory implementation.
//!
//! A medium is a synchronous string store keyed by string, the shape of a
//! browser's local storage. The [`ProgressStore`](crate::store::ProgressStore)
//! keeps its whole mapping under a single key and never relies on the medium
//! for anything beyond get/set/remove of that one entry.

use std::fmt::Debug;

pub mod errors;
mod in_memory;

pub use errors::MediumError;
pub use in_memory::InMemory;

/// Synchronous string store abstracting the host's persistence medium.
///
/// Implementations may enforce a size limit and reject writes past it with
/// [`MediumError::QuotaExceeded`], or refuse all access with
/// [`MediumError::Unavailable`]. Callers treat both as recoverable.
pub trait Medium: Send + Sync + Debug {
    /// Reads the value stored under `key`.
    ///
    /// # Returns
    /// `Ok(None)` if nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, MediumError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), MediumError>;

    /// Deletes the value under `key`. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), MediumError>;
}
