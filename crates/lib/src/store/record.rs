use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Number;

use crate::{PageKey, clock::millis_to_utc};

/// The whole persisted state: one record per page.
///
/// Ordered by key so serialization and eviction tie-breaks are deterministic.
pub type PositionMap = BTreeMap<PageKey, PositionRecord>;

/// Last known vertical offset for one page and when it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Vertical scroll offset in pixels.
    #[serde(rename = "scrollTop", deserialize_with = "non_negative_number")]
    pub offset: u64,
    /// Write time, milliseconds since Unix epoch.
    #[serde(rename = "timestamp", deserialize_with = "non_negative_number")]
    pub saved_at: u64,
}

impl PositionRecord {
    pub fn new(offset: u64, saved_at: u64) -> Self {
        Self { offset, saved_at }
    }

    /// Milliseconds since the record was written. Zero if `now` is earlier.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.saved_at)
    }

    /// Whether the record is strictly older than `threshold_ms`.
    pub fn is_expired(&self, now: u64, threshold_ms: u64) -> bool {
        self.age(now) > threshold_ms
    }

    pub fn saved_at_utc(&self) -> Option<DateTime<Utc>> {
        millis_to_utc(self.saved_at)
    }
}

/// The persisted form of the mapping, as read from the medium.
pub(crate) type StoredMap = BTreeMap<PageKey, StoredRecord>;

/// A record as persisted, keeping its numbers exactly as they were read.
///
/// Other producers write fractional offsets. A record the store does not
/// change serializes back to the same text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredRecord {
    #[serde(rename = "scrollTop", deserialize_with = "non_negative_raw")]
    offset: Number,
    #[serde(rename = "timestamp", deserialize_with = "non_negative_raw")]
    saved_at: Number,
}

impl StoredRecord {
    pub(crate) fn record(&self) -> PositionRecord {
        PositionRecord::new(number_to_u64(&self.offset), self.saved_at())
    }

    pub(crate) fn saved_at(&self) -> u64 {
        number_to_u64(&self.saved_at)
    }

    /// Moves the write time to `now`, leaving the offset as it was stored.
    pub(crate) fn touch(&mut self, now: u64) {
        self.saved_at = Number::from(now);
    }
}

impl From<PositionRecord> for StoredRecord {
    fn from(record: PositionRecord) -> Self {
        Self {
            offset: Number::from(record.offset),
            saved_at: Number::from(record.saved_at),
        }
    }
}

/// Integers convert exactly; fractions are rounded.
fn number_to_u64(number: &Number) -> u64 {
    match number.as_u64() {
        Some(value) => value,
        None => number.as_f64().map_or(0, |value| value.round() as u64),
    }
}

/// Browsers report fractional scroll offsets; accept any non-negative JSON
/// number.
fn non_negative_raw<'de, D>(deserializer: D) -> Result<Number, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Number::deserialize(deserializer)?;
    if number.as_u64().is_some() || number.as_f64().is_some_and(|value| value >= 0.0) {
        Ok(number)
    } else {
        Err(de::Error::custom(format!(
            "expected a non-negative number, found {number}"
        )))
    }
}

fn non_negative_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    non_negative_raw(deserializer).map(|number| number_to_u64(&number))
}
