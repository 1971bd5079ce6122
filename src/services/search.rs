use crate::clients::QueueService;

/// What happened to one service's replacement search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Search-on-delete is off for this service.
    Disabled,
    /// Nothing was removed, so there is nothing to search for.
    Empty,
    /// Pretend mode: the search was only logged.
    Pretended,
    /// The service accepted the command and reported this status.
    Triggered { status: String },
    /// The command failed; logged and otherwise ignored.
    Failed { message: String },
}

/// Issue a single batched search for every media id removed this cycle.
///
/// Failures are logged and reported, never propagated: a cycle whose search
/// trigger failed still counts as successful.
pub async fn dispatch_search(
    service: &dyn QueueService,
    batch: &[i64],
    enabled: bool,
    pretend: bool,
) -> SearchOutcome {
    let kind = service.kind();

    if !enabled {
        return SearchOutcome::Disabled;
    }
    if batch.is_empty() {
        tracing::debug!(service = %kind, "No removed items, skipping search");
        return SearchOutcome::Empty;
    }
    if pretend {
        tracing::info!(service = %kind, ids = ?batch, "PRETEND: Will search {} for replacements", kind);
        return SearchOutcome::Pretended;
    }

    match service.trigger_search(batch).await {
        Ok(status) => {
            tracing::info!(
                service = %kind,
                ids = ?batch,
                status = %status,
                "Triggered replacement search for {} items",
                batch.len()
            );
            SearchOutcome::Triggered { status }
        }
        Err(err) => {
            tracing::error!(service = %kind, ids = ?batch, error = %err, "Failed to trigger search");
            SearchOutcome::Failed {
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ClientError, MockQueueService};
    use crate::models::ServiceKind;

    fn mock() -> MockQueueService {
        let mut mock = MockQueueService::new();
        mock.expect_kind().return_const(ServiceKind::Sonarr);
        mock
    }

    #[test]
    fn test_disabled_makes_no_call() {
        let mut service = mock();
        service.expect_trigger_search().times(0);
        assert_eq!(
            tokio_test::block_on(dispatch_search(&service, &[1, 2], false, false)),
            SearchOutcome::Disabled
        );
    }

    #[test]
    fn test_empty_batch_makes_no_call() {
        let mut service = mock();
        service.expect_trigger_search().times(0);
        assert_eq!(
            tokio_test::block_on(dispatch_search(&service, &[], true, false)),
            SearchOutcome::Empty
        );
    }

    #[tokio::test]
    async fn test_pretend_makes_no_call() {
        let mut service = mock();
        service.expect_trigger_search().times(0);
        assert_eq!(
            dispatch_search(&service, &[3], true, true).await,
            SearchOutcome::Pretended
        );
    }

    #[tokio::test]
    async fn test_single_batched_request() {
        let mut service = mock();
        service
            .expect_trigger_search()
            .withf(|ids: &[i64]| ids == [42, 43])
            .times(1)
            .returning(|_| Ok("queued".to_string()));

        assert_eq!(
            dispatch_search(&service, &[42, 43], true, false).await,
            SearchOutcome::Triggered {
                status: "queued".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_raised() {
        let mut service = mock();
        service.expect_trigger_search().times(1).returning(|_| {
            Err(ClientError::Api {
                status_code: 503,
                message: "busy".into(),
            })
        });

        let outcome = dispatch_search(&service, &[1], true, false).await;
        assert!(matches!(outcome, SearchOutcome::Failed { .. }));
    }
}
