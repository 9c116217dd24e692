//! Data models for Thoughts

mod settings;
mod status;
mod thought;

pub use settings::{
    InputMode, SyncMode, SyncSettings, DEFAULT_BRANCH, DEFAULT_PATH_TEMPLATE,
};
pub use status::SyncStatus;
pub use thought::{Location, Thought, ThoughtId, ThoughtKey, MAPS_URL_TEMPLATE};
