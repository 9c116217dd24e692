pub mod add;
pub mod common;
pub mod config;
pub mod export;
pub mod flags;
pub mod geocode;
pub mod list;
pub mod status;
pub mod sync;
