//! Remote collaborators: the torrent client and the two queue services.
//!
//! The pipeline in [`crate::services`] only sees the [`TorrentSource`] and
//! [`QueueService`] traits. [`DelugeClient`] and [`ArrClient`] are the HTTP
//! implementations used by the binary; tests substitute in-memory fakes.

mod arr;
mod deluge;
mod error;

pub use arr::ArrClient;
pub use deluge::DelugeClient;
pub use error::{ClientError, Result};

use async_trait::async_trait;

use crate::models::{QueueRecord, RemoveOptions, ServiceKind, TorrentSnapshot};

/// Read access to the torrent client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TorrentSource: Send + Sync {
    /// Establish (or refresh) the session with the client.
    async fn connect(&self) -> Result<()>;

    /// All torrents currently in the downloading state.
    async fn list_downloading(&self) -> Result<Vec<TorrentSnapshot>>;

    /// Label assigned to a torrent; empty when it has none.
    async fn get_label(&self, id: &str) -> Result<String>;
}

/// A media-automation service tracking downloads in a queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueService: Send + Sync {
    fn kind(&self) -> ServiceKind;

    /// Verify the service is reachable and the credentials work.
    async fn connect(&self) -> Result<()>;

    /// The whole queue, unpaged.
    async fn list_queue(&self) -> Result<Vec<QueueRecord>>;

    /// Delete a queue record.
    async fn remove_queue_record(&self, record: &QueueRecord, options: RemoveOptions)
    -> Result<()>;

    /// Ask the service to search for replacements. Returns the command status.
    async fn trigger_search(&self, media_ids: &[i64]) -> Result<String>;
}
