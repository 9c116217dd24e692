//! Client-facing services built on the store and sync engine.

mod thoughts;

pub use thoughts::{status_line, Captured, ThoughtService};
