//! Deferred sync execution.
//!
//! A trigger asks something outside the caller to run a push later. There is
//! no latency or delivery guarantee; callers fall back to an immediate push
//! when registration is refused.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use thiserror::Error;

use super::SyncEngine;

/// Tag used for the deferred push of unsynced thoughts
pub const SYNC_TAG: &str = "sync-thoughts";

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("Deferred execution is not supported here")]
    Unsupported,
    #[error("Deferred execution registration failed: {0}")]
    Failed(String),
}

pub trait DeferredTrigger: Send + Sync {
    /// Ask for the work identified by `tag` to run eventually.
    fn register(&self, tag: &str) -> Result<(), TriggerError>;
}

/// For environments with no background scheduler (e.g. a one-shot CLI).
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedTrigger;

impl DeferredTrigger for UnsupportedTrigger {
    fn register(&self, _tag: &str) -> Result<(), TriggerError> {
        Err(TriggerError::Unsupported)
    }
}

/// Runs a push on the tokio runtime after a delay.
///
/// Registrations of a tag that is already scheduled are coalesced. Only a
/// weak reference to the engine is held; a scheduled run whose engine has
/// been dropped does nothing.
pub struct TokioTrigger {
    engine: Weak<SyncEngine>,
    delay: Duration,
    scheduled: Arc<Mutex<HashSet<String>>>,
}

impl TokioTrigger {
    pub fn new(engine: Weak<SyncEngine>, delay: Duration) -> Self {
        Self {
            engine,
            delay,
            scheduled: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl DeferredTrigger for TokioTrigger {
    fn register(&self, tag: &str) -> Result<(), TriggerError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|error| TriggerError::Failed(error.to_string()))?;

        {
            let mut scheduled = self
                .scheduled
                .lock()
                .map_err(|_| TriggerError::Failed("scheduler lock poisoned".into()))?;
            if !scheduled.insert(tag.to_string()) {
                tracing::debug!("Deferred {} already scheduled", tag);
                return Ok(());
            }
        }

        let engine = self.engine.clone();
        let scheduled = Arc::clone(&self.scheduled);
        let delay = self.delay;
        let tag = tag.to_string();
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(mut scheduled) = scheduled.lock() {
                scheduled.remove(&tag);
            }
            let Some(engine) = engine.upgrade() else {
                tracing::debug!("Sync engine gone, dropping deferred {}", tag);
                return;
            };
            tracing::info!("Running deferred {}", tag);
            let status = engine.push().await;
            tracing::info!("Deferred {} finished: {}", tag, status);
        });

        Ok(())
    }
}
