// Core data structures for the tavolo watcher

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical identifier for one bookable slot.
///
/// Produced by the normalizer; two raw records denoting the same slot must
/// map to the same id. This equality contract is what deduplication rests on.
pub type AvailabilityId = String;

/// The set of availability ids produced by one poll cycle.
///
/// Set semantics: duplicates within a cycle collapse, and the ordered set
/// gives notification messages a deterministic enumeration order.
pub type Snapshot = BTreeSet<AvailabilityId>;

/// One raw record returned by the availability source.
///
/// The upstream payload is loosely structured: a record may be a plain
/// string, a number, or an object carrying a date and optionally a list of
/// time slots. Only the normalizer inspects this shape; every other
/// component works with [`AvailabilityId`] values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AvailabilityItem {
    /// Plain string record, e.g. `"2025-11-01"`
    Text(String),

    /// Numeric record, e.g. a date serial
    Number(serde_json::Number),

    /// Structured record with named fields
    Record(serde_json::Map<String, serde_json::Value>),

    /// Anything else (null, bool, nested array); normalized as a last resort
    Other(serde_json::Value),
}

impl AvailabilityItem {
    /// Build an item from an arbitrary JSON value
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::Object(map) => Self::Record(map),
            other => Self::Other(other),
        }
    }
}

/// Whether the engine is currently polling or idling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineMode {
    /// Polling on the active cadence
    Active,
    /// Inside the quiet window (or forced asleep); no availability polling
    Quiet,
}

impl EngineMode {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Quiet => "quiet",
        }
    }
}

impl std::fmt::Display for EngineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of the most recent poll attempts, updated after every cycle.
///
/// The persisted layout is `{lastPollAt, lastFoundAt, backoffLevel}`;
/// `next_poll_eta` is derived state and lives only in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollStatus {
    /// When the last poll attempt finished (success or failure)
    #[serde(rename = "lastPollAt")]
    pub last_poll_at: Option<DateTime<Utc>>,

    /// When new availability was last found
    #[serde(rename = "lastFoundAt")]
    pub last_found_at: Option<DateTime<Utc>>,

    /// Count of consecutive source failures driving the retry delay
    #[serde(rename = "backoffLevel")]
    pub backoff_level: u32,

    /// When the next poll is due
    #[serde(skip)]
    pub next_poll_eta: Option<DateTime<Utc>>,
}

impl PollStatus {
    /// Record a successful poll
    pub fn record_success(&mut self, now: DateTime<Utc>, found: bool) {
        self.last_poll_at = Some(now);
        self.backoff_level = 0;
        if found {
            self.last_found_at = Some(now);
        }
    }

    /// Record a failed poll, returning the new backoff level
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> u32 {
        self.last_poll_at = Some(now);
        self.backoff_level = self.backoff_level.saturating_add(1);
        self.backoff_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_availability_item_from_value() {
        let text = AvailabilityItem::from_value(json!("2025-11-01"));
        assert!(matches!(text, AvailabilityItem::Text(_)));

        let number = AvailabilityItem::from_value(json!(20251101));
        assert!(matches!(number, AvailabilityItem::Number(_)));

        let record = AvailabilityItem::from_value(json!({"Date": "2025-11-01"}));
        assert!(matches!(record, AvailabilityItem::Record(_)));

        let other = AvailabilityItem::from_value(json!(null));
        assert!(matches!(other, AvailabilityItem::Other(_)));
    }

    #[test]
    fn test_availability_item_untagged_deserialization() {
        let items: Vec<AvailabilityItem> =
            serde_json::from_value(json!(["2025-11-01", 42, {"Date": "2025-11-02"}])).unwrap();

        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], AvailabilityItem::Text(_)));
        assert!(matches!(items[1], AvailabilityItem::Number(_)));
        assert!(matches!(items[2], AvailabilityItem::Record(_)));
    }

    #[test]
    fn test_poll_status_success_resets_backoff() {
        let mut status = PollStatus {
            backoff_level: 4,
            ..Default::default()
        };

        let now = Utc::now();
        status.record_success(now, true);

        assert_eq!(status.backoff_level, 0);
        assert_eq!(status.last_poll_at, Some(now));
        assert_eq!(status.last_found_at, Some(now));
    }

    #[test]
    fn test_poll_status_failure_increments_backoff() {
        let mut status = PollStatus::default();
        let now = Utc::now();

        assert_eq!(status.record_failure(now), 1);
        assert_eq!(status.record_failure(now), 2);
        assert_eq!(status.record_failure(now), 3);
        assert!(status.last_found_at.is_none());
    }

    #[test]
    fn test_poll_status_persisted_layout() {
        let status = PollStatus {
            last_poll_at: None,
            last_found_at: None,
            backoff_level: 2,
            next_poll_eta: Some(Utc::now()),
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["backoffLevel"], 2);
        assert!(json.get("next_poll_eta").is_none());
        assert!(json.get("nextPollEta").is_none());
    }

    #[test]
    fn test_engine_mode_display() {
        assert_eq!(EngineMode::Active.as_str(), "active");
        assert_eq!(EngineMode::Quiet.to_string(), "quiet");
    }
}
