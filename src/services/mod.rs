//! Services module - the stall-detection and reconciliation pipeline.
//!
//! Everything here works against the [`TorrentSource`](crate::clients::TorrentSource)
//! and [`QueueService`](crate::clients::QueueService) traits, never against HTTP
//! directly, so the whole pipeline runs in tests with in-memory collaborators.
//!
//! # Components
//!
//! - [`classify`] / [`collect_stalled`]: decide which downloading torrents never moved any data
//! - [`filter_by_label`]: keep only torrents with an allowed Deluge label
//! - [`matches`]: queue title vs torrent name (exact or prefix)
//! - [`QueueReconciler`]: delete and blocklist matching queue records for one service
//! - [`dispatch_search`]: one batched replacement search per service
//! - [`Processor`]: one full cycle, services in order (Sonarr, then Radarr)
//! - [`Scheduler`]: the fixed-interval timer loop
//!
//! # Failure policy
//!
//! | Failure                              | Effect                                  |
//! |--------------------------------------|-----------------------------------------|
//! | torrent client connect / status      | cycle aborted ([`ProcessError`])        |
//! | label lookup                         | cycle aborted ([`ProcessError`])        |
//! | queue fetch                          | that service skipped, cycle continues   |
//! | queue record delete                  | logged, torrent stays a candidate       |
//! | search trigger                       | logged, cycle still succeeds            |

pub mod label;
pub mod matcher;
pub mod process;
pub mod reconcile;
pub mod scheduler;
pub mod search;
pub mod stall;

pub use label::filter_by_label;
pub use matcher::matches;
pub use process::{CycleReport, ProcessError, ProcessOptions, Processor, ServiceReport};
pub use reconcile::{QueueFetchError, QueueReconciler, ReconcileOutcome};
pub use scheduler::Scheduler;
pub use search::{SearchOutcome, dispatch_search};
pub use stall::{classify, collect_stalled};
