//! Two-way sync between the local log and one remote markdown file per day.
//!
//! `pull` merges today's remote file into the store. `push` appends every
//! unsynced thought to its day's file and marks exactly the pushed records
//! synced once all days are written. A failed day aborts the remaining days
//! and leaves every flag untouched, so a retry may append duplicates to the
//! days that did succeed.

mod deferred;
mod error;
mod merge;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::db::{KeyValueStore, SettingsRepository};
use crate::error::Error;
use crate::flags::{Feature, FeatureFlags};
use crate::geocode::GeocodePipeline;
use crate::markdown;
use crate::models::{SyncSettings, SyncStatus, Thought, ThoughtKey};
use crate::remote::RemoteFileStore;
use crate::store::RecordStore;
use crate::util::today;

pub use deferred::{DeferredTrigger, TokioTrigger, TriggerError, UnsupportedTrigger, SYNC_TAG};
pub use error::{SyncError, SyncResult};
pub use merge::{merge_remote, MergeOutcome};

/// Longest a push waits for pending geocodes before going ahead without them.
pub const GEOCODE_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default delay before a scheduled deferred push runs.
pub const DEFAULT_DEFERRED_DELAY: Duration = Duration::from_secs(5);

const MERGE_ATTEMPTS: usize = 3;

/// Receives every progress and outcome status the engine reports.
pub type StatusObserver = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

enum TriggerKind {
    None,
    Shared(Arc<dyn DeferredTrigger>),
    Scheduled(Duration),
}

pub struct SyncEngineBuilder {
    store: Arc<RecordStore>,
    kv: Arc<dyn KeyValueStore>,
    remote: Arc<dyn RemoteFileStore>,
    geocoder: Option<GeocodePipeline>,
    trigger: TriggerKind,
    observer: Option<StatusObserver>,
    geocode_wait: Duration,
}

impl SyncEngineBuilder {
    /// Pipeline whose pending lookups a push waits for
    #[must_use]
    pub fn geocoder(mut self, geocoder: GeocodePipeline) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: Arc<dyn DeferredTrigger>) -> Self {
        self.trigger = TriggerKind::Shared(trigger);
        self
    }

    /// Defer pushes onto the tokio runtime, `delay` after registration
    #[must_use]
    pub fn scheduled_trigger(mut self, delay: Duration) -> Self {
        self.trigger = TriggerKind::Scheduled(delay);
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: StatusObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub const fn geocode_wait(mut self, wait: Duration) -> Self {
        self.geocode_wait = wait;
        self
    }

    pub fn build(self) -> Arc<SyncEngine> {
        Arc::new_cyclic(|engine| {
            let trigger: Option<Arc<dyn DeferredTrigger>> = match self.trigger {
                TriggerKind::None => None,
                TriggerKind::Shared(trigger) => Some(trigger),
                TriggerKind::Scheduled(delay) => {
                    Some(Arc::new(TokioTrigger::new(engine.clone(), delay)))
                }
            };
            SyncEngine {
                store: self.store,
                settings: SettingsRepository::new(Arc::clone(&self.kv)),
                flags: FeatureFlags::new(self.kv),
                remote: self.remote,
                geocoder: self.geocoder,
                trigger,
                observer: self.observer,
                geocode_wait: self.geocode_wait,
            }
        })
    }
}

pub struct SyncEngine {
    store: Arc<RecordStore>,
    settings: SettingsRepository,
    flags: FeatureFlags,
    remote: Arc<dyn RemoteFileStore>,
    geocoder: Option<GeocodePipeline>,
    trigger: Option<Arc<dyn DeferredTrigger>>,
    observer: Option<StatusObserver>,
    geocode_wait: Duration,
}

impl SyncEngine {
    pub fn builder(
        store: Arc<RecordStore>,
        kv: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteFileStore>,
    ) -> SyncEngineBuilder {
        SyncEngineBuilder {
            store,
            kv,
            remote,
            geocoder: None,
            trigger: TriggerKind::None,
            observer: None,
            geocode_wait: GEOCODE_WAIT_TIMEOUT,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.settings.sync_settings().is_some()
    }

    /// Merge today's remote file into the store.
    ///
    /// `Ok(None)` when there was nothing to do: sync is not configured, the
    /// file does not exist, or it holds no parseable entries.
    pub async fn pull(&self) -> SyncResult<Option<SyncStatus>> {
        self.pull_date(&today()).await
    }

    /// Merge the remote file for `date` (`YYYY-MM-DD`) into the store.
    pub async fn pull_date(&self, date: &str) -> SyncResult<Option<SyncStatus>> {
        let Some(settings) = self.settings.sync_settings() else {
            tracing::debug!("Sync not configured, skipping pull");
            return Ok(None);
        };

        let path = settings.path_for(date);
        let Some(file) = self.remote.fetch(&settings, &path).await? else {
            tracing::info!("No remote thoughts for {}", date);
            return Ok(None);
        };

        let remote = markdown::decode(&file.content, date);
        if remote.is_empty() {
            tracing::info!("No parseable thoughts in {}", path);
            return Ok(None);
        }

        let count = remote.len();
        let outcome = self.merge_into_store(remote)?;
        tracing::info!(
            "Pulled {} thought(s) for {}: {} added, {} conflict(s), {} already present",
            count,
            date,
            outcome.added,
            outcome.conflicts,
            outcome.duplicates
        );

        let status = SyncStatus::DownloadComplete { count };
        self.report(&status);
        Ok(Some(status))
    }

    /// Append every unsynced thought to its day file.
    ///
    /// Always returns a terminal status; failures come back as
    /// [`SyncStatus::SyncFailed`] and are also sent to the observer.
    pub async fn push(&self) -> SyncStatus {
        let status = match self.try_push().await {
            Ok(status) => status,
            Err(error) => {
                tracing::warn!("Sync failed: {}", error);
                SyncStatus::SyncFailed {
                    error: error.to_string(),
                }
            }
        };
        self.report(&status);
        status
    }

    /// Hand the push to the deferred trigger, or run it now when there is no
    /// trigger or it refuses the registration.
    pub async fn dispatch(&self) -> SyncStatus {
        if let Some(trigger) = &self.trigger {
            match trigger.register(SYNC_TAG) {
                Ok(()) => {
                    tracing::info!("Deferred sync registered");
                    let status = SyncStatus::Queued;
                    self.report(&status);
                    return status;
                }
                Err(error) => {
                    tracing::info!("Deferred sync unavailable, syncing now: {}", error);
                }
            }
        }
        self.push().await
    }

    async fn try_push(&self) -> SyncResult<SyncStatus> {
        let settings = self
            .settings
            .sync_settings()
            .ok_or(SyncError::NotConfigured)?;

        if let Some(geocoder) = &self.geocoder {
            if self.flags.is_enabled(Feature::Geocoding) && geocoder.has_pending() {
                self.report(&SyncStatus::WaitingGeocoding);
                geocoder.await_drain(self.geocode_wait).await;
            }
        }

        let unsynced = self.store.unsynced()?;
        if unsynced.is_empty() {
            tracing::info!("Nothing to sync");
            return Ok(SyncStatus::AlreadySynced);
        }

        let count = unsynced.len();
        self.report(&SyncStatus::Syncing { count });

        let mut by_date: BTreeMap<String, Vec<Thought>> = BTreeMap::new();
        for thought in unsynced {
            by_date.entry(thought.date()).or_default().push(thought);
        }

        for (date, thoughts) in &by_date {
            self.push_day(&settings, date, thoughts)
                .await
                .map_err(|error| SyncError::Day {
                    date: date.clone(),
                    source: Box::new(error),
                })?;
        }

        let pushed: HashSet<ThoughtKey> = by_date.values().flatten().map(Thought::key).collect();
        let marked = self.store.mark_synced(&pushed)?;
        tracing::info!("Synced {} thought(s) across {} day(s)", marked, by_date.len());

        Ok(SyncStatus::SyncComplete { count })
    }

    async fn push_day(
        &self,
        settings: &SyncSettings,
        date: &str,
        thoughts: &[Thought],
    ) -> SyncResult<()> {
        let path = settings.path_for(date);
        let existing = self.remote.fetch(settings, &path).await?;

        let content = markdown::append_to_day_file(
            existing.as_ref().map(|file| file.content.as_str()),
            date,
            thoughts,
        );
        let message = format!("Add {} thought(s) - {}", thoughts.len(), date);

        self.remote
            .store(
                settings,
                &path,
                &content,
                &message,
                existing.as_ref().map(|file| file.revision.as_str()),
            )
            .await?;
        tracing::debug!("Committed {} to {}", message, path);
        Ok(())
    }

    /// Merge against a fresh snapshot and write back only if nothing else
    /// wrote in between; otherwise merge again.
    fn merge_into_store(&self, remote: Vec<Thought>) -> SyncResult<MergeOutcome> {
        let mut last_error = None;
        for _ in 0..MERGE_ATTEMPTS {
            let snapshot = self.store.snapshot()?;
            let outcome = merge_remote(snapshot.thoughts, remote.clone());
            match self.store.replace_if(snapshot.version, &outcome.thoughts) {
                Ok(()) => return Ok(outcome),
                Err(error @ Error::StaleWrite { .. }) => {
                    tracing::debug!("Store changed during merge, retrying: {}", error);
                    last_error = Some(error);
                }
                Err(error) => return Err(error.into()),
            }
        }
        Err(last_error
            .unwrap_or_else(|| Error::Database("merge did not run".into()))
            .into())
    }

    fn report(&self, status: &SyncStatus) {
        tracing::debug!("Sync status: {}", status);
        if let Some(observer) = &self.observer {
            observer(status);
        }
    }
}
