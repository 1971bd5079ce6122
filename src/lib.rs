// unstall - removes stalled Deluge torrents from the Sonarr and Radarr queues
//
// This is the library crate containing the pipeline, the clients, and the data structures.
// The binary crate (main.rs) provides the command-line entry point.

pub mod bootstrap;
pub mod clients;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{QueueRecord, ServiceKind, Settings, StalledSet, TorrentSnapshot};
pub use services::{CycleReport, Processor, Scheduler};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
