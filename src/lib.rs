//! Scrobble Station - local scrobble ingestion and listening analytics
//!
//! Raw JSON exports are normalized into an append-only NDJSON log, and the
//! whole log is folded into an analytics snapshot on every build.

pub mod analytics;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod scrobble;
pub mod server;
pub mod store;

pub use error::{Result, StationError};
