//! Capture flow shared by clients.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::db::{KeyValueStore, SettingsRepository};
use crate::error::{Error, Result};
use crate::flags::{Feature, FeatureFlags};
use crate::geocode::GeocodePipeline;
use crate::models::{Location, SyncStatus, Thought};
use crate::store::RecordStore;
use crate::sync::{SyncEngine, SyncResult};
use crate::util::normalize_text_option;

/// Decimal places kept for captured coordinates (~1 m).
const COORDINATE_DECIMALS: i32 = 5;

/// What a capture did besides storing the thought.
#[derive(Debug)]
pub struct Captured {
    pub thought: Thought,
    /// Resolves to the place name once the background lookup has been
    /// applied to the store; `None` when no lookup was queued.
    pub enrichment: Option<JoinHandle<Option<String>>>,
    /// Outcome of the automatic sync, when the sync mode is `auto`
    pub sync: Option<SyncStatus>,
}

/// Capture, enrichment and automatic sync over one record store.
#[derive(Clone)]
pub struct ThoughtService {
    store: Arc<RecordStore>,
    settings: SettingsRepository,
    flags: FeatureFlags,
    geocoder: Option<GeocodePipeline>,
    engine: Arc<SyncEngine>,
}

impl ThoughtService {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        store: Arc<RecordStore>,
        engine: Arc<SyncEngine>,
        geocoder: Option<GeocodePipeline>,
    ) -> Self {
        Self {
            store,
            settings: SettingsRepository::new(Arc::clone(&kv)),
            flags: FeatureFlags::new(kv),
            geocoder,
            engine,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    pub const fn settings(&self) -> &SettingsRepository {
        &self.settings
    }

    pub const fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    pub const fn geocoder(&self) -> Option<&GeocodePipeline> {
        self.geocoder.as_ref()
    }

    /// Store a new thought, queue its place-name lookup, and sync it when
    /// the sync mode is `auto`.
    pub async fn capture(&self, text: &str, location: Option<Location>) -> Result<Captured> {
        let text = normalize_text_option(Some(text.to_string()))
            .ok_or_else(|| Error::InvalidInput("thought must not be empty".into()))?;
        let location = location.map(normalize_location).transpose()?;

        let mut thought = Thought::new(text);
        thought.location = location;
        self.store.append(thought.clone())?;
        tracing::info!("Captured thought {}", thought.id);

        let enrichment = self.enrich(&thought);

        let sync = match self.settings.sync_settings() {
            Some(settings) if settings.is_auto() => Some(self.engine.dispatch().await),
            _ => None,
        };

        Ok(Captured {
            thought,
            enrichment,
            sync,
        })
    }

    /// Queue a lookup and apply the resolved name to the stored record.
    fn enrich(&self, thought: &Thought) -> Option<JoinHandle<Option<String>>> {
        if !self.flags.is_enabled(Feature::Geocoding) {
            return None;
        }
        let ticket = self.geocoder.as_ref()?.enqueue(thought)?;
        let store = Arc::clone(&self.store);

        Some(tokio::spawn(async move {
            let key = ticket.key;
            let name = ticket.resolved().await?;
            match store.set_location_name(key, &name) {
                Ok(true) => {
                    tracing::info!("Updated thought {} with location: {}", key.id, name);
                    Some(name)
                }
                Ok(false) => None,
                Err(error) => {
                    tracing::warn!("Failed to store location for {}: {}", key.id, error);
                    None
                }
            }
        }))
    }

    /// Startup routine: in `auto` mode pull today's file, then push if
    /// anything is still unsynced. A failed pull does not prevent the push.
    pub async fn startup_sync(&self) -> SyncResult<Option<SyncStatus>> {
        match self.settings.sync_settings() {
            Some(settings) if settings.is_auto() => {}
            _ => return Ok(None),
        }

        let mut last = match self.engine.pull().await {
            Ok(status) => status,
            Err(error) => {
                tracing::warn!("Startup pull failed: {}", error);
                None
            }
        };

        if self.store.unsynced_count()? > 0 {
            last = Some(self.engine.push().await);
        }
        Ok(last)
    }

    /// Thoughts newest first, optionally only unsynced ones.
    pub fn list(&self, limit: Option<usize>, unsynced_only: bool) -> Result<Vec<Thought>> {
        let thoughts = self
            .store
            .all()?
            .into_iter()
            .filter(|thought| !unsynced_only || !thought.synced);
        Ok(match limit {
            Some(limit) => thoughts.take(limit).collect(),
            None => thoughts.collect(),
        })
    }

    /// `"<n> queued"` while anything is unsynced, otherwise `"synced"`.
    pub fn status_line(&self) -> Result<String> {
        Ok(status_line(self.store.unsynced_count()?))
    }
}

#[must_use]
pub fn status_line(unsynced: usize) -> String {
    if unsynced > 0 {
        format!("{unsynced} queued")
    } else {
        "synced".to_string()
    }
}

fn normalize_location(location: Location) -> Result<Location> {
    if !location.has_coordinates()
        || !(-90.0..=90.0).contains(&location.lat)
        || !(-180.0..=180.0).contains(&location.lon)
    {
        return Err(Error::InvalidInput(format!(
            "invalid coordinates: {}, {}",
            location.lat, location.lon
        )));
    }
    Ok(Location {
        lat: round_coordinate(location.lat),
        lon: round_coordinate(location.lon),
        name: normalize_text_option(location.name),
    })
}

fn round_coordinate(value: f64) -> f64 {
    let scale = 10_f64.powi(COORDINATE_DECIMALS);
    (value * scale).round() / scale
}
