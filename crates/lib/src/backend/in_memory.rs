//! In-memory medium implementation
//!
//! Suitable for tests, benches and hosts without a native string store.
//! Clones share the same underlying map, so a test can keep a handle to
//! inspect what the store wrote.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{Medium, MediumError};

#[derive(Debug, Default)]
struct State {
    values: HashMap<String, String>,
    unavailable: bool,
}

/// A `HashMap`-backed [`Medium`] with an optional size limit.
///
/// The limit counts the bytes of every key and value, the way browsers
/// account local storage quota.
#[derive(Debug, Clone, Default)]
pub struct InMemory {
    state: Arc<RwLock<State>>,
    quota: Option<usize>,
}

impl InMemory {
    /// Creates a new, empty medium with no size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new, empty medium that rejects writes past `limit` bytes.
    pub fn with_quota(limit: usize) -> Self {
        Self {
            state: Arc::default(),
            quota: Some(limit),
        }
    }

    /// Total bytes currently held, keys included.
    pub fn used_bytes(&self) -> usize {
        self.state
            .read()
            .map(|state| footprint(&state.values))
            .unwrap_or(0)
    }

    /// Makes every subsequent operation fail with [`MediumError::Unavailable`]
    /// until re-enabled.
    #[cfg(any(test, feature = "testing"))]
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.write() {
            state.unavailable = unavailable;
        }
    }

    fn poisoned() -> MediumError {
        MediumError::Unavailable {
            reason: "in-memory medium lock poisoned".to_string(),
        }
    }
}

fn footprint(values: &HashMap<String, String>) -> usize {
    values.iter().map(|(k, v)| k.len() + v.len()).sum()
}

fn check_available(state: &State) -> Result<(), MediumError> {
    if state.unavailable {
        return Err(MediumError::Unavailable {
            reason: "medium disabled".to_string(),
        });
    }
    Ok(())
}

impl Medium for InMemory {
    fn get(&self, key: &str) -> Result<Option<String>, MediumError> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        check_available(&state)?;
        Ok(state.values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MediumError> {
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        check_available(&state)?;

        if let Some(limit) = self.quota {
            let replaced = state
                .values
                .get(key)
                .map(|old| key.len() + old.len())
                .unwrap_or(0);
            let required = footprint(&state.values) - replaced + key.len() + value.len();
            if required > limit {
                return Err(MediumError::QuotaExceeded {
                    key: key.to_string(),
                    required,
                    limit,
                });
            }
        }

        state.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MediumError> {
        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        check_available(&state)?;
        state.values.remove(key);
        Ok(())
    }
}
