use std::time::{Duration, SystemTime};

use crate::models::{StalledSet, TorrentSnapshot};

/// Decide whether a torrent has stalled.
///
/// Only torrents that never moved any data qualify: no ETA, nothing
/// downloaded, never completed, and added more than `stall_duration` before
/// `now`. A torrent sitting exactly on the boundary is not stalled yet.
pub fn classify(snapshot: &TorrentSnapshot, now: SystemTime, stall_duration: Duration) -> bool {
    if snapshot.eta != 0 || snapshot.total_done != 0 || snapshot.completed_time != 0 {
        return false;
    }

    match snapshot.added_at().checked_add(stall_duration) {
        Some(cutoff) => now > cutoff,
        None => false,
    }
}

/// Keep the stalled torrents, in input order.
pub fn collect_stalled(
    torrents: Vec<TorrentSnapshot>,
    now: SystemTime,
    stall_duration: Duration,
) -> StalledSet {
    torrents
        .into_iter()
        .filter(|torrent| {
            let stalled = classify(torrent, now, stall_duration);
            if stalled {
                tracing::debug!(torrent = %torrent.id, name = %torrent.name, "Found stalled torrent");
            }
            stalled
        })
        .map(|torrent| (torrent.id.clone(), torrent))
        .collect()
}
