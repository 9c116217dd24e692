//! Local thought log.
//!
//! The whole sequence lives under one key/value entry and every mutation
//! rewrites it in full. A process-wide guard serializes those
//! read-modify-write cycles, and a version counter lets callers that read,
//! await remote I/O, then write back detect that someone else wrote first.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::{get_json, set_json, KeyValueStore};
use crate::error::{Error, Result};
use crate::models::{Thought, ThoughtKey};

/// Key the thought sequence is persisted under.
pub const THOUGHTS_KEY: &str = "thoughts";

/// A consistent read of the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Store version the read was taken at
    pub version: u64,
    /// Thoughts, newest first
    pub thoughts: Vec<Thought>,
}

/// Append-only thought log with full-sequence replace semantics
pub struct RecordStore {
    kv: Arc<dyn KeyValueStore>,
    version: Mutex<u64>,
}

impl RecordStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            version: Mutex::new(0),
        }
    }

    /// Insert a thought at the front (newest first)
    pub fn append(&self, thought: Thought) -> Result<()> {
        self.update(|thoughts| thoughts.insert(0, thought))
    }

    /// All thoughts, newest first
    pub fn all(&self) -> Result<Vec<Thought>> {
        let _guard = self.lock()?;
        self.load()
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        let guard = self.lock()?;
        Ok(Snapshot {
            version: *guard,
            thoughts: self.load()?,
        })
    }

    /// Overwrite the whole sequence
    pub fn replace(&self, thoughts: &[Thought]) -> Result<()> {
        let mut guard = self.lock()?;
        self.save(&mut guard, thoughts)
    }

    /// Overwrite the whole sequence only if nobody wrote since `expected`
    pub fn replace_if(&self, expected: u64, thoughts: &[Thought]) -> Result<()> {
        let mut guard = self.lock()?;
        if *guard != expected {
            return Err(Error::StaleWrite {
                expected,
                current: *guard,
            });
        }
        self.save(&mut guard, thoughts)
    }

    /// Read-modify-write under the store guard
    pub fn update<T>(&self, apply: impl FnOnce(&mut Vec<Thought>) -> T) -> Result<T> {
        let mut guard = self.lock()?;
        let mut thoughts = self.load()?;
        let output = apply(&mut thoughts);
        self.save(&mut guard, &thoughts)?;
        Ok(output)
    }

    /// Thoughts not yet written to the remote store, newest first
    pub fn unsynced(&self) -> Result<Vec<Thought>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|thought| !thought.synced)
            .collect())
    }

    pub fn unsynced_count(&self) -> Result<usize> {
        Ok(self.all()?.iter().filter(|thought| !thought.synced).count())
    }

    /// Mark every thought synced; returns how many changed
    pub fn mark_all_synced(&self) -> Result<usize> {
        self.update(|thoughts| {
            let mut changed = 0;
            for thought in thoughts.iter_mut().filter(|thought| !thought.synced) {
                thought.synced = true;
                changed += 1;
            }
            changed
        })
    }

    /// Mark only the given thoughts synced; returns how many changed
    pub fn mark_synced(&self, keys: &HashSet<ThoughtKey>) -> Result<usize> {
        self.update(|thoughts| {
            let mut changed = 0;
            for thought in thoughts
                .iter_mut()
                .filter(|thought| !thought.synced && keys.contains(&thought.key()))
            {
                thought.synced = true;
                changed += 1;
            }
            changed
        })
    }

    /// Attach a resolved place name to the thought addressed by `key`, if it
    /// has coordinates but no name yet.
    pub fn set_location_name(&self, key: ThoughtKey, name: &str) -> Result<bool> {
        self.update(|thoughts| {
            let target = thoughts.iter_mut().find(|thought| {
                thought.key() == key
                    && thought
                        .location
                        .as_ref()
                        .is_some_and(|location| !location.has_name())
            });
            match target.and_then(|thought| thought.location.as_mut()) {
                Some(location) => {
                    location.name = Some(name.to_string());
                    true
                }
                None => false,
            }
        })
    }

    /// Current write version (increments on every successful write)
    pub fn version(&self) -> Result<u64> {
        Ok(*self.lock()?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, u64>> {
        self.version
            .lock()
            .map_err(|_| Error::Database("record store lock poisoned".into()))
    }

    fn load(&self) -> Result<Vec<Thought>> {
        Ok(get_json(self.kv.as_ref(), THOUGHTS_KEY)?.unwrap_or_default())
    }

    fn save(&self, version: &mut MutexGuard<'_, u64>, thoughts: &[Thought]) -> Result<()> {
        set_json(self.kv.as_ref(), THOUGHTS_KEY, thoughts)?;
        **version += 1;
        Ok(())
    }
}
