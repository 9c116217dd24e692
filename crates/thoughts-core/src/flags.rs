//! Feature flags.
//!
//! Stable features are always on. Experimental features are off until
//! enabled, and their state is persisted as a JSON object of booleans.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::db::{get_json, set_json, KeyValueStore};
use crate::error::{Error, Result};

pub const FEATURE_FLAGS_KEY: &str = "feature_flags";
pub const EXPERIMENTAL_MODE_KEY: &str = "experimental_mode";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Capture,
    Export,
    Sync,
    LocationCoords,
    Geocoding,
    VoiceCapture,
    Tags,
    Search,
    TwoWaySyncMultiDay,
}

impl Feature {
    pub const STABLE: [Self; 4] = [
        Self::Capture,
        Self::Export,
        Self::Sync,
        Self::LocationCoords,
    ];

    pub const EXPERIMENTAL: [Self; 5] = [
        Self::Geocoding,
        Self::VoiceCapture,
        Self::Tags,
        Self::Search,
        Self::TwoWaySyncMultiDay,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Export => "export",
            Self::Sync => "sync",
            Self::LocationCoords => "location_coords",
            Self::Geocoding => "geocoding",
            Self::VoiceCapture => "voice_capture",
            Self::Tags => "tags",
            Self::Search => "search",
            Self::TwoWaySyncMultiDay => "two_way_sync_multi_day",
        }
    }

    #[must_use]
    pub const fn is_stable(self) -> bool {
        matches!(
            self,
            Self::Capture | Self::Export | Self::Sync | Self::LocationCoords
        )
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Capture => "Capture thoughts",
            Self::Export => "Markdown export",
            Self::Sync => "Sync to GitHub",
            Self::LocationCoords => "Attach capture coordinates",
            Self::Geocoding => "Location names (e.g., \"Warsaw, Poland\")",
            Self::VoiceCapture => "Voice input for thoughts",
            Self::Tags => "Support for #hashtags",
            Self::Search => "Full-text search",
            Self::TwoWaySyncMultiDay => "Multi-day sync scanning",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::STABLE
            .into_iter()
            .chain(Self::EXPERIMENTAL)
            .find(|feature| feature.as_str() == s.trim())
            .ok_or_else(|| Error::InvalidInput(format!("Unknown feature: {}", s.trim())))
    }
}

/// Result of a flag spec such as `off`, `all`, or `geocoding,tags`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagSpec {
    /// Experimental mode off, every experimental feature disabled
    Off,
    /// Experimental mode on, every experimental feature enabled
    All,
    /// Experimental mode on, the listed features enabled
    Some(Vec<String>),
}

impl FromStr for FlagSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Err(Error::InvalidInput("flag spec must not be empty".into())),
            "off" => Ok(Self::Off),
            "experimental" | "all" => Ok(Self::All),
            list => Ok(Self::Some(
                list.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
        }
    }
}

/// Persisted feature flag state
#[derive(Clone)]
pub struct FeatureFlags {
    kv: Arc<dyn KeyValueStore>,
}

impl FeatureFlags {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        if feature.is_stable() {
            return true;
        }
        self.stored()
            .get(feature.as_str())
            .copied()
            .unwrap_or(false)
    }

    /// Turn on an experimental feature. Returns `false` for stable ones,
    /// which cannot be toggled.
    pub fn enable(&self, feature: Feature) -> Result<bool> {
        self.set(feature, true)
    }

    /// Turn off an experimental feature. Returns `false` for stable ones.
    pub fn disable(&self, feature: Feature) -> Result<bool> {
        self.set(feature, false)
    }

    pub fn is_experimental_mode(&self) -> bool {
        matches!(self.kv.get(EXPERIMENTAL_MODE_KEY), Ok(Some(value)) if value == "true")
    }

    pub fn enable_experimental_mode(&self) -> Result<()> {
        self.kv.set(EXPERIMENTAL_MODE_KEY, "true")?;
        tracing::info!("Experimental mode enabled");
        Ok(())
    }

    /// Leaving experimental mode also switches off every experimental feature.
    pub fn disable_experimental_mode(&self) -> Result<()> {
        self.kv.set(EXPERIMENTAL_MODE_KEY, "false")?;
        let mut flags = self.stored();
        for feature in Feature::EXPERIMENTAL {
            flags.insert(feature.as_str().to_string(), false);
        }
        set_json(self.kv.as_ref(), FEATURE_FLAGS_KEY, &flags)?;
        tracing::info!("Experimental mode disabled");
        Ok(())
    }

    /// Apply a flag spec; returns the names that were not experimental
    /// features and were therefore ignored.
    pub fn apply(&self, spec: &FlagSpec) -> Result<Vec<String>> {
        match spec {
            FlagSpec::Off => {
                self.disable_experimental_mode()?;
                Ok(Vec::new())
            }
            FlagSpec::All => {
                self.enable_experimental_mode()?;
                let mut flags = self.stored();
                for feature in Feature::EXPERIMENTAL {
                    flags.insert(feature.as_str().to_string(), true);
                }
                set_json(self.kv.as_ref(), FEATURE_FLAGS_KEY, &flags)?;
                Ok(Vec::new())
            }
            FlagSpec::Some(names) => {
                self.enable_experimental_mode()?;
                let mut ignored = Vec::new();
                for name in names {
                    match name.parse::<Feature>() {
                        Ok(feature) if !feature.is_stable() => {
                            self.enable(feature)?;
                        }
                        _ => {
                            tracing::warn!("Ignoring unknown experimental feature: {}", name);
                            ignored.push(name.clone());
                        }
                    }
                }
                Ok(ignored)
            }
        }
    }

    /// Every feature with its current state, stable ones first
    pub fn list(&self) -> Vec<(Feature, bool)> {
        Feature::STABLE
            .into_iter()
            .chain(Feature::EXPERIMENTAL)
            .map(|feature| (feature, self.is_enabled(feature)))
            .collect()
    }

    fn set(&self, feature: Feature, enabled: bool) -> Result<bool> {
        if feature.is_stable() {
            tracing::warn!("Feature \"{}\" is stable and always enabled", feature);
            return Ok(false);
        }
        let mut flags = self.stored();
        flags.insert(feature.as_str().to_string(), enabled);
        set_json(self.kv.as_ref(), FEATURE_FLAGS_KEY, &flags)?;
        tracing::info!(
            "{} feature: {}",
            if enabled { "Enabled" } else { "Disabled" },
            feature
        );
        Ok(true)
    }

    /// Unknown keys written by other clients are kept as-is.
    fn stored(&self) -> BTreeMap<String, bool> {
        match get_json(self.kv.as_ref(), FEATURE_FLAGS_KEY) {
            Ok(flags) => flags.unwrap_or_default(),
            Err(error) => {
                tracing::warn!("Ignoring unreadable feature flags: {}", error);
                BTreeMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryKeyValueStore;
    use pretty_assertions::assert_eq;

    fn flags() -> FeatureFlags {
        FeatureFlags::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[test]
    fn stable_features_are_always_on() {
        let flags = flags();
        for feature in Feature::STABLE {
            assert!(flags.is_enabled(feature));
            assert!(!flags.disable(feature).unwrap());
            assert!(flags.is_enabled(feature));
        }
    }

    #[test]
    fn experimental_features_default_off() {
        let flags = flags();
        for feature in Feature::EXPERIMENTAL {
            assert!(!flags.is_enabled(feature));
        }
        assert!(!flags.is_experimental_mode());
    }

    #[test]
    fn enable_and_disable_persist() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let flags = FeatureFlags::new(Arc::clone(&kv));
        assert!(flags.enable(Feature::Geocoding).unwrap());
        assert!(FeatureFlags::new(Arc::clone(&kv)).is_enabled(Feature::Geocoding));
        assert_eq!(
            kv.get(FEATURE_FLAGS_KEY).unwrap().as_deref(),
            Some(r#"{"geocoding":true}"#)
        );

        assert!(flags.disable(Feature::Geocoding).unwrap());
        assert!(!flags.is_enabled(Feature::Geocoding));
    }

    #[test]
    fn parse_flag_specs() {
        assert_eq!("off".parse::<FlagSpec>().unwrap(), FlagSpec::Off);
        assert_eq!("all".parse::<FlagSpec>().unwrap(), FlagSpec::All);
        assert_eq!("experimental".parse::<FlagSpec>().unwrap(), FlagSpec::All);
        assert_eq!(
            " geocoding, tags ,".parse::<FlagSpec>().unwrap(),
            FlagSpec::Some(vec!["geocoding".into(), "tags".into()])
        );
        assert!("  ".parse::<FlagSpec>().is_err());
    }

    #[test]
    fn apply_list_enables_known_and_reports_unknown() {
        let flags = flags();
        let ignored = flags
            .apply(&"geocoding,teleport,capture".parse().unwrap())
            .unwrap();
        assert_eq!(ignored, vec!["teleport".to_string(), "capture".to_string()]);
        assert!(flags.is_experimental_mode());
        assert!(flags.is_enabled(Feature::Geocoding));
        assert!(!flags.is_enabled(Feature::Tags));
    }

    #[test]
    fn apply_all_then_off() {
        let flags = flags();
        flags.apply(&FlagSpec::All).unwrap();
        assert!(Feature::EXPERIMENTAL
            .into_iter()
            .all(|feature| flags.is_enabled(feature)));

        flags.apply(&FlagSpec::Off).unwrap();
        assert!(!flags.is_experimental_mode());
        assert!(Feature::EXPERIMENTAL
            .into_iter()
            .all(|feature| !flags.is_enabled(feature)));
    }

    #[test]
    fn feature_names_round_trip() {
        assert_eq!(
            "two_way_sync_multi_day".parse::<Feature>().unwrap(),
            Feature::TwoWaySyncMultiDay
        );
        assert_eq!(Feature::LocationCoords.to_string(), "location_coords");
        assert!("nope".parse::<Feature>().is_err());
    }
}
