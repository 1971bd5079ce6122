use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;

use super::label::filter_by_label;
use super::reconcile::QueueReconciler;
use super::search::{SearchOutcome, dispatch_search};
use super::stall::collect_stalled;
use crate::clients::{ClientError, QueueService, TorrentSource};
use crate::metrics::Metrics;
use crate::models::{SearchBatch, ServiceKind};

/// Errors that abort a whole cycle.
///
/// Service-level failures (queue fetch, delete, search) never show up here;
/// they are logged and recorded in the [`CycleReport`].
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to connect to torrent client: {0}")]
    Connect(#[source] ClientError),

    #[error("Failed to fetch torrent status: {0}")]
    FetchStatus(#[source] ClientError),

    #[error("Failed to look up torrent labels: {0}")]
    LabelLookup(#[source] ClientError),
}

/// Cycle-wide knobs taken from the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOptions {
    pub stall_duration: Duration,
    pub only_labels: Vec<String>,
    pub pretend: bool,
}

/// A queue service taking part in reconciliation.
pub struct ServiceSlot {
    pub service: Arc<dyn QueueService>,
    pub search_on_delete: bool,
}

/// What one service did during a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceReport {
    pub service: ServiceKind,
    pub removed: Vec<String>,
    pub failed: Vec<String>,
    pub pretended: Vec<String>,
    pub search_batch: SearchBatch,
    pub search: SearchOutcome,
    /// Set when the queue could not be fetched and the service was skipped.
    pub fetch_error: Option<String>,
}

impl ServiceReport {
    fn new(service: ServiceKind) -> Self {
        Self {
            service,
            removed: Vec::new(),
            failed: Vec::new(),
            pretended: Vec::new(),
            search_batch: Vec::new(),
            search: SearchOutcome::Empty,
            fetch_error: None,
        }
    }
}

/// Summary of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Torrents in the downloading state.
    pub downloading: usize,
    /// Torrents classified stalled.
    pub stalled: usize,
    /// Stalled torrents left after the label filter.
    pub candidates: usize,
    /// One entry per enabled service, in reconciliation order.
    pub services: Vec<ServiceReport>,
    /// Candidate ids no service removed.
    pub remaining: Vec<String>,
}

/// Runs the stall-detection pipeline.
///
/// One cycle: fetch status, classify, filter by label, reconcile each
/// service in order, then dispatch the searches. The candidate set is passed
/// by value from one reconciler to the next.
pub struct Processor {
    torrents: Arc<dyn TorrentSource>,
    services: Vec<ServiceSlot>,
    options: ProcessOptions,
    metrics: Arc<Metrics>,
}

impl Processor {
    pub fn new(torrents: Arc<dyn TorrentSource>, options: ProcessOptions) -> Self {
        Self {
            torrents,
            services: Vec::new(),
            options,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Append a service. Services are reconciled in the order they are added.
    pub fn with_service(mut self, service: Arc<dyn QueueService>, search_on_delete: bool) -> Self {
        self.services.push(ServiceSlot {
            service,
            search_on_delete,
        });
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Run one cycle against the current time, logging and recording the outcome.
    pub async fn run_cycle(&self) -> Result<CycleReport, ProcessError> {
        let started = Instant::now();
        tracing::debug!("Starting process");

        let result = self.process_cycle(SystemTime::now()).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(report) => {
                self.metrics.record_cycle_completed(elapsed);
                tracing::info!(
                    downloading = report.downloading,
                    stalled = report.stalled,
                    candidates = report.candidates,
                    remaining = report.remaining.len(),
                    "Cycle finished in {:.2}s",
                    elapsed.as_secs_f32()
                );
            }
            Err(err) => {
                self.metrics.record_cycle_failed(elapsed);
                tracing::error!(error = %err, "Cycle aborted");
            }
        }
        self.metrics.log_periodic();

        result
    }

    /// One full pass of the pipeline, evaluated against `now`.
    pub async fn process_cycle(&self, now: SystemTime) -> Result<CycleReport, ProcessError> {
        let torrents = self.torrents.as_ref();

        torrents.connect().await.map_err(ProcessError::Connect)?;
        let downloading = torrents
            .list_downloading()
            .await
            .map_err(ProcessError::FetchStatus)?;
        let downloading_count = downloading.len();

        let stalled = collect_stalled(downloading, now, self.options.stall_duration);
        let stalled_count = stalled.len();
        for id in stalled.keys() {
            tracing::debug!(torrent = %id, "Target stalled torrent");
        }

        let mut candidates = filter_by_label(stalled, &self.options.only_labels, torrents)
            .await
            .map_err(ProcessError::LabelLookup)?;
        let candidate_count = candidates.len();

        let mut reports = Vec::with_capacity(self.services.len());
        for slot in &self.services {
            let kind = slot.service.kind();
            let mut report = ServiceReport::new(kind);

            match QueueReconciler::new(slot.service.as_ref())
                .reconcile(candidates, self.options.pretend)
                .await
            {
                Ok(outcome) => {
                    candidates = outcome.remaining;
                    self.metrics.record_removed(outcome.removed.len());
                    self.metrics.record_removal_failures(outcome.failed.len());
                    self.metrics.record_pretend_matches(outcome.pretended.len());
                    report.removed = outcome.removed;
                    report.failed = outcome.failed;
                    report.pretended = outcome.pretended;
                    report.search_batch = outcome.search_batch;
                }
                Err(err) => {
                    tracing::error!(service = %kind, error = %err.source, "Skipping {} this cycle", kind);
                    self.metrics.record_queue_fetch_failure();
                    report.fetch_error = Some(err.source.to_string());
                    candidates = err.stalled;
                }
            }

            reports.push(report);
        }

        for (slot, report) in self.services.iter().zip(reports.iter_mut()) {
            report.search = dispatch_search(
                slot.service.as_ref(),
                &report.search_batch,
                slot.search_on_delete,
                self.options.pretend,
            )
            .await;

            match report.search {
                SearchOutcome::Triggered { .. } => self.metrics.record_search_triggered(),
                SearchOutcome::Failed { .. } => self.metrics.record_search_failed(),
                _ => {}
            }
        }

        Ok(CycleReport {
            downloading: downloading_count,
            stalled: stalled_count,
            candidates: candidate_count,
            services: reports,
            remaining: candidates.into_keys().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{MockQueueService, MockTorrentSource};
    use crate::models::{QueueRecord, TorrentSnapshot, TorrentState};
    use std::sync::atomic::Ordering;
    use std::time::UNIX_EPOCH;

    const T0: u64 = 1_700_000_000;
    const HOUR: Duration = Duration::from_secs(3600);

    fn torrent(id: &str, name: &str) -> TorrentSnapshot {
        TorrentSnapshot {
            id: id.to_string(),
            name: name.to_string(),
            eta: 0,
            total_done: 0,
            completed_time: 0,
            time_added: T0 as f64,
            state: TorrentState::Downloading,
        }
    }

    fn now() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(T0) + 2 * HOUR
    }

    fn options(pretend: bool) -> ProcessOptions {
        ProcessOptions {
            stall_duration: HOUR,
            only_labels: Vec::new(),
            pretend,
        }
    }

    fn source(torrents: Vec<TorrentSnapshot>) -> MockTorrentSource {
        let mut source = MockTorrentSource::new();
        source.expect_connect().returning(|| Ok(()));
        source
            .expect_list_downloading()
            .returning(move || Ok(torrents.clone()));
        source
    }

    #[tokio::test]
    async fn test_status_failure_is_fatal() {
        let mut source = MockTorrentSource::new();
        source.expect_connect().returning(|| Ok(()));
        source
            .expect_list_downloading()
            .returning(|| Err(ClientError::Unexpected("offline".into())));

        let mut sonarr = MockQueueService::new();
        sonarr.expect_kind().return_const(ServiceKind::Sonarr);
        sonarr.expect_list_queue().times(0);

        let processor = Processor::new(Arc::new(source), options(false))
            .with_service(Arc::new(sonarr), true);
        let err = processor.process_cycle(now()).await.unwrap_err();
        assert!(matches!(err, ProcessError::FetchStatus(_)));
    }

    #[tokio::test]
    async fn test_connect_failure_is_fatal() {
        let mut source = MockTorrentSource::new();
        source
            .expect_connect()
            .returning(|| Err(ClientError::Auth("bad password".into())));
        source.expect_list_downloading().times(0);

        let processor = Processor::new(Arc::new(source), options(false));
        let err = processor.run_cycle().await.unwrap_err();
        assert!(matches!(err, ProcessError::Connect(_)));
        assert_eq!(processor.metrics().cycles_failed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_label_failure_is_fatal() {
        let mut source = source(vec![torrent("A", "Foo")]);
        source
            .expect_get_label()
            .returning(|_| Err(ClientError::Unexpected("label plugin disabled".into())));

        let processor = Processor::new(
            Arc::new(source),
            ProcessOptions {
                only_labels: vec!["tv".into()],
                ..options(false)
            },
        );
        let err = processor.process_cycle(now()).await.unwrap_err();
        assert!(matches!(err, ProcessError::LabelLookup(_)));
    }

    #[tokio::test]
    async fn test_queue_failure_does_not_stop_next_service() {
        let mut sonarr = MockQueueService::new();
        sonarr.expect_kind().return_const(ServiceKind::Sonarr);
        sonarr
            .expect_list_queue()
            .returning(|| Err(ClientError::Api { status_code: 502, message: "bad gateway".into() }));

        let mut radarr = MockQueueService::new();
        radarr.expect_kind().return_const(ServiceKind::Radarr);
        radarr.expect_list_queue().returning(|| {
            Ok(vec![QueueRecord {
                id: 9,
                title: "Movie.2020".into(),
                media_id: Some(77),
            }])
        });
        radarr
            .expect_remove_queue_record()
            .times(1)
            .returning(|_, _| Ok(()));
        radarr
            .expect_trigger_search()
            .withf(|ids: &[i64]| ids == [77])
            .times(1)
            .returning(|_| Ok("queued".into()));

        let processor = Processor::new(
            Arc::new(source(vec![torrent("M", "Movie.2020.1080p")])),
            options(false),
        )
        .with_service(Arc::new(sonarr), true)
        .with_service(Arc::new(radarr), true);

        let report = processor.process_cycle(now()).await.unwrap();
        assert!(report.services[0].fetch_error.is_some());
        assert_eq!(report.services[0].search, SearchOutcome::Empty);
        assert_eq!(report.services[1].removed, vec!["M"]);
        assert_eq!(
            report.services[1].search,
            SearchOutcome::Triggered { status: "queued".into() }
        );
        assert!(report.remaining.is_empty());
        assert_eq!(
            processor.metrics().queue_fetch_failures.load(Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_removed_by_first_service_not_seen_by_second() {
        let mut sonarr = MockQueueService::new();
        sonarr.expect_kind().return_const(ServiceKind::Sonarr);
        sonarr.expect_list_queue().returning(|| {
            Ok(vec![QueueRecord {
                id: 1,
                title: "Shared.Title".into(),
                media_id: Some(5),
            }])
        });
        sonarr
            .expect_remove_queue_record()
            .times(1)
            .returning(|_, _| Ok(()));

        let mut radarr = MockQueueService::new();
        radarr.expect_kind().return_const(ServiceKind::Radarr);
        radarr.expect_list_queue().returning(|| {
            Ok(vec![QueueRecord {
                id: 2,
                title: "Shared.Title".into(),
                media_id: Some(6),
            }])
        });
        radarr.expect_remove_queue_record().times(0);

        let processor = Processor::new(
            Arc::new(source(vec![torrent("S", "Shared.Title.x264")])),
            options(false),
        )
        .with_service(Arc::new(sonarr), false)
        .with_service(Arc::new(radarr), false);

        let report = processor.process_cycle(now()).await.unwrap();
        assert_eq!(report.services[0].removed, vec!["S"]);
        assert!(report.services[1].removed.is_empty());
        assert_eq!(report.services[0].search, SearchOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_fresh_torrents_are_not_candidates() {
        let mut young = torrent("Y", "Young.Release");
        young.time_added = (T0 + 2 * 3600 - 60) as f64;

        let mut sonarr = MockQueueService::new();
        sonarr.expect_kind().return_const(ServiceKind::Sonarr);
        sonarr.expect_list_queue().returning(|| {
            Ok(vec![QueueRecord {
                id: 1,
                title: "Young.Release".into(),
                media_id: Some(1),
            }])
        });
        sonarr.expect_remove_queue_record().times(0);

        let processor = Processor::new(Arc::new(source(vec![young])), options(false))
            .with_service(Arc::new(sonarr), true);

        let report = processor.process_cycle(now()).await.unwrap();
        assert_eq!(report.downloading, 1);
        assert_eq!(report.stalled, 0);
        assert_eq!(report.services[0].search, SearchOutcome::Empty);
    }
}
