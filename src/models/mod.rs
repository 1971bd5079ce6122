//! Data models for unstall.
//!
//! - [`Settings`]: runtime configuration, loaded by [`ConfigManager`](crate::config::ConfigManager)
//! - [`TorrentSnapshot`] / [`StalledSet`]: torrent status as fetched from Deluge, and the
//!   per-cycle set of stalled candidates
//! - [`QueueRecord`] / [`SearchBatch`]: Sonarr and Radarr queue entries, and the media ids
//!   gathered for a replacement search
//!
//! Nothing in here talks to the network.

pub mod config;
pub mod queue;
pub mod torrent;

pub use config::{ConfigError, ServiceSettings, Settings, format_duration, parse_duration};
pub use queue::{QueueRecord, RemoveOptions, SearchBatch, ServiceKind};
pub use torrent::{StalledSet, TorrentSnapshot, TorrentState};
