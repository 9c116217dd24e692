//! Thought model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::util::date_key;

/// Map link template used for coordinates.
pub const MAPS_URL_TEMPLATE: &str = "https://www.google.com/maps?q={lat},{lon}";

/// Identifier of a thought, derived from its capture time in Unix ms.
///
/// Two captures in the same millisecond share an id; that collision is
/// tolerated rather than corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThoughtId(i64);

impl ThoughtId {
    /// Build an id from a capture time
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Build an id from an instant
    #[must_use]
    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Self {
        Self(timestamp.timestamp_millis())
    }

    /// Raw integer value
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// The id one above this one (used for conflict copies)
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for ThoughtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ThoughtId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Coordinates attached to a thought, with an optional resolved place name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    /// Human-readable place name, filled in by geocoding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Location {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether a non-empty place name is present
    #[must_use]
    pub fn has_name(&self) -> bool {
        self.name.as_deref().is_some_and(|name| !name.trim().is_empty())
    }

    /// Whether both coordinates are usable numbers
    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Link to the coordinates on a web map
    #[must_use]
    pub fn maps_url(&self) -> String {
        MAPS_URL_TEMPLATE
            .replace("{lat}", &self.lat.to_string())
            .replace("{lon}", &self.lon.to_string())
    }
}

/// Identity used to address a specific record in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThoughtKey {
    pub id: ThoughtId,
    pub timestamp: DateTime<Utc>,
}

/// A captured thought
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thought {
    /// Identifier derived from capture time
    pub id: ThoughtId,
    /// Plain text content, line breaks preserved
    pub text: String,
    /// Capture instant
    pub timestamp: DateTime<Utc>,
    /// Optional capture location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Whether the thought has been written to the remote store
    #[serde(default)]
    pub synced: bool,
}

impl Thought {
    /// Create an unsynced thought captured now
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self::captured_at(text, Utc::now())
    }

    /// Create an unsynced thought captured at the given instant
    #[must_use]
    pub fn captured_at(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: ThoughtId::from_timestamp(timestamp),
            text: text.into(),
            timestamp,
            location: None,
            synced: false,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    #[must_use]
    pub const fn key(&self) -> ThoughtKey {
        ThoughtKey {
            id: self.id,
            timestamp: self.timestamp,
        }
    }

    /// UTC calendar date of the capture (`YYYY-MM-DD`)
    #[must_use]
    pub fn date(&self) -> String {
        date_key(self.timestamp)
    }

    /// Copy kept when a remote record collides with a local one at the same
    /// instant: id bumped by one, timestamp pushed forward one second.
    #[must_use]
    pub fn conflict_copy(mut self) -> Self {
        self.id = self.id.next();
        self.timestamp += Duration::seconds(1);
        self
    }

    /// Get first line as a preview, truncated to `max_len` characters
    #[must_use]
    pub fn title_preview(&self, max_len: usize) -> String {
        self.text
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_id_from_capture_time() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let thought = Thought::captured_at("Buy milk", at);
        assert_eq!(thought.id.as_i64(), 1_704_103_200_000);
        assert!(!thought.synced);
        assert_eq!(thought.date(), "2024-01-01");
    }

    #[test]
    fn test_conflict_copy_shifts_id_and_time() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let copy = Thought::captured_at("B", at).conflict_copy();
        assert_eq!(copy.id.as_i64(), 1_704_103_200_001);
        assert_eq!(copy.timestamp, at + Duration::seconds(1));
    }

    #[test]
    fn test_maps_url() {
        let location = Location::new(52.2297, 21.0122);
        assert_eq!(
            location.maps_url(),
            "https://www.google.com/maps?q=52.2297,21.0122"
        );
    }

    #[test]
    fn test_has_name_ignores_blank() {
        assert!(!Location::new(1.0, 2.0).has_name());
        assert!(!Location::new(1.0, 2.0).with_name("  ").has_name());
        assert!(Location::new(1.0, 2.0).with_name("Kyiv").has_name());
    }

    #[test]
    fn test_reads_legacy_json() {
        let raw = r#"{"id":1704103200000,"text":"hi","timestamp":"2024-01-01T10:00:00.000Z","synced":true}"#;
        let thought: Thought = serde_json::from_str(raw).unwrap();
        assert_eq!(thought.text, "hi");
        assert!(thought.synced);
        assert!(thought.location.is_none());
    }

    #[test]
    fn test_id_parse() {
        let id: ThoughtId = " 42 ".parse().unwrap();
        assert_eq!(id, ThoughtId::from_millis(42));
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn test_title_preview() {
        let thought = Thought::new("First line\nSecond line");
        assert_eq!(thought.title_preview(50), "First line");
        assert_eq!(thought.title_preview(5), "First");
    }
}
