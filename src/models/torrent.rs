use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Torrent state as reported by the torrent client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TorrentState {
    Downloading,
    Seeding,
    Paused,
    Checking,
    Queued,
    Error,
    Moving,
    Allocating,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Raw status of one torrent at the time it was fetched.
///
/// Timestamps are seconds since the Unix epoch; `completed_time == 0` means
/// the torrent never finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentSnapshot {
    pub id: String,
    pub name: String,
    pub eta: i64,
    pub total_done: u64,
    pub completed_time: i64,
    pub time_added: f64,
    pub state: TorrentState,
}

impl TorrentSnapshot {
    /// When the torrent was added, truncated to whole seconds. Negative or
    /// non-finite values clamp to the epoch.
    pub fn added_at(&self) -> SystemTime {
        let secs = Duration::try_from_secs_f64(self.time_added.trunc()).unwrap_or(Duration::ZERO);
        UNIX_EPOCH + secs
    }
}

/// Torrents currently believed stalled, keyed by torrent id.
///
/// Built once per cycle and only ever shrinks while the queues are reconciled.
pub type StalledSet = IndexMap<String, TorrentSnapshot>;
