use thiserror::Error;

use super::matcher::matches;
use crate::clients::{ClientError, QueueService};
use crate::models::{SearchBatch, ServiceKind, StalledSet};

/// The queue could not be fetched, so nothing was reconciled.
///
/// Carries the candidate set back unchanged so the next service can still
/// work with it.
#[derive(Debug, Error)]
#[error("failed to fetch {service} queue: {source}")]
pub struct QueueFetchError {
    pub service: ServiceKind,
    pub stalled: StalledSet,
    #[source]
    pub source: ClientError,
}

/// Result of walking one service's queue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    /// Candidates that were not removed by this service.
    pub remaining: StalledSet,
    /// Media ids of the removed records, for the replacement search.
    pub search_batch: SearchBatch,
    /// Torrent ids whose queue record was deleted.
    pub removed: Vec<String>,
    /// Torrent ids whose queue record could not be deleted.
    pub failed: Vec<String>,
    /// Torrent ids that would have been removed outside pretend mode.
    pub pretended: Vec<String>,
}

/// Matches one service's queue against the stalled candidates.
pub struct QueueReconciler<'a> {
    service: &'a dyn QueueService,
}

impl<'a> QueueReconciler<'a> {
    pub fn new(service: &'a dyn QueueService) -> Self {
        Self { service }
    }

    /// Remove every queue record whose title matches a stalled torrent.
    ///
    /// A torrent leaves the set only after its record was actually deleted.
    /// In pretend mode the intended removals are logged and the set is
    /// returned unchanged with an empty batch.
    pub async fn reconcile(
        &self,
        mut stalled: StalledSet,
        pretend: bool,
    ) -> Result<ReconcileOutcome, QueueFetchError> {
        let service = self.service.kind();
        tracing::debug!(%service, candidates = stalled.len(), "Starting queue reconciliation");

        let queue = match self.service.list_queue().await {
            Ok(queue) => queue,
            Err(source) => {
                return Err(QueueFetchError {
                    service,
                    stalled,
                    source,
                });
            }
        };

        let options = service.remove_options();
        let mut outcome = ReconcileOutcome::default();

        for record in &queue {
            let matched: Vec<String> = stalled
                .iter()
                .filter(|(_, torrent)| matches(&record.title, &torrent.name))
                .map(|(id, _)| id.clone())
                .collect();

            if matched.len() > 1 {
                tracing::debug!(
                    %service,
                    record = record.id,
                    title = %record.title,
                    torrents = ?matched,
                    "Queue record matches several stalled torrents"
                );
            }

            for id in matched {
                if pretend {
                    tracing::info!(
                        %service,
                        torrent = %id,
                        record = record.id,
                        "PRETEND: Will delete {} from {}",
                        record.title,
                        service
                    );
                    outcome.pretended.push(id);
                    continue;
                }

                match self.service.remove_queue_record(record, options).await {
                    Ok(()) => {
                        tracing::info!(
                            %service,
                            torrent = %id,
                            record = record.id,
                            "Removed and blocklisted {}",
                            record.title
                        );
                        stalled.shift_remove(&id);
                        if let Some(media_id) = record.media_id {
                            outcome.search_batch.push(media_id);
                        }
                        outcome.removed.push(id);
                    }
                    Err(err) => {
                        tracing::error!(
                            %service,
                            torrent = %id,
                            record = record.id,
                            error = %err,
                            "Failed to remove {} from {}",
                            record.title,
                            service
                        );
                        outcome.failed.push(id);
                    }
                }
            }
        }

        tracing::debug!(
            %service,
            removed = outcome.removed.len(),
            failed = outcome.failed.len(),
            remaining = stalled.len(),
            "Done queue reconciliation"
        );

        outcome.remaining = stalled;
        Ok(outcome)
    }
}
