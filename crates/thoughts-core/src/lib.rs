//! thoughts-core - Core library for Thoughts
//!
//! This crate contains the record store, markdown codec, geocode enrichment
//! pipeline, and GitHub sync engine used by every Thoughts client.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod flags;
pub mod geocode;
pub mod markdown;
pub mod models;
pub mod remote;
pub mod services;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Location, SyncStatus, Thought, ThoughtId};
pub use store::RecordStore;
