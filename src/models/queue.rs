use serde::{Deserialize, Serialize};
use std::fmt;

/// The downstream media-automation services, in reconciliation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Sonarr,
    Radarr,
}

impl ServiceKind {
    /// Declaration order; Sonarr is always reconciled before Radarr.
    pub const ALL: [ServiceKind; 2] = [ServiceKind::Sonarr, ServiceKind::Radarr];

    /// Options sent when removing a stalled queue record.
    ///
    /// Sonarr only gets the blacklist flag and keeps its own default for
    /// client removal; Radarr is told explicitly to drop the download.
    pub fn remove_options(self) -> RemoveOptions {
        match self {
            ServiceKind::Sonarr => RemoveOptions {
                blocklist: true,
                remove_from_client: false,
            },
            ServiceKind::Radarr => RemoveOptions {
                blocklist: true,
                remove_from_client: true,
            },
        }
    }

    /// Query parameter name for the blocklist flag.
    pub fn blocklist_param(self) -> &'static str {
        match self {
            ServiceKind::Sonarr => "blacklist",
            ServiceKind::Radarr => "blocklist",
        }
    }

    /// Command name that searches for replacement releases.
    pub fn search_command(self) -> &'static str {
        match self {
            ServiceKind::Sonarr => "EpisodeSearch",
            ServiceKind::Radarr => "MoviesSearch",
        }
    }

    /// JSON field carrying the media ids of a search command.
    pub fn search_ids_field(self) -> &'static str {
        match self {
            ServiceKind::Sonarr => "episodeIds",
            ServiceKind::Radarr => "movieIds",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::Sonarr => "sonarr",
            ServiceKind::Radarr => "radarr",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One download a queue service is tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRecord {
    /// Queue entry id, used to delete the entry.
    pub id: i64,
    pub title: String,
    /// Episode id (Sonarr) or movie id (Radarr); absent for unknown downloads.
    pub media_id: Option<i64>,
}

/// Flags for removing a queue record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoveOptions {
    pub blocklist: bool,
    pub remove_from_client: bool,
}

/// Media ids collected for one service during one cycle, in removal order.
pub type SearchBatch = Vec<i64>;
