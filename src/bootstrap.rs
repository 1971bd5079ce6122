//! Startup wiring: build the HTTP clients from [`Settings`], connect them,
//! and assemble the [`Processor`].

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::clients::{ArrClient, DelugeClient, QueueService, TorrentSource};
use crate::metrics::Metrics;
use crate::models::{ServiceKind, Settings};
use crate::services::{ProcessOptions, Processor};

/// The torrent client plus the enabled queue services.
pub struct Collaborators {
    pub torrents: Arc<dyn TorrentSource>,
    pub sonarr: Option<Arc<dyn QueueService>>,
    pub radarr: Option<Arc<dyn QueueService>>,
}

impl Collaborators {
    /// Build HTTP clients for the torrent client and every enabled service.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let torrents = DelugeClient::new(
            &settings.deluge_url,
            settings.deluge_password.clone(),
            settings.request_timeout,
        )
        .context("Failed to build Deluge client")?;

        Ok(Self {
            torrents: Arc::new(torrents),
            sonarr: arr_client(settings, ServiceKind::Sonarr)?,
            radarr: arr_client(settings, ServiceKind::Radarr)?,
        })
    }

    /// Connect everything concurrently. Any failure is fatal.
    pub async fn connect_all(&self) -> Result<()> {
        let torrents = async {
            self.torrents
                .connect()
                .await
                .context("Failed to connect to Deluge")
        };

        tokio::try_join!(
            torrents,
            connect_optional(self.sonarr.as_deref()),
            connect_optional(self.radarr.as_deref()),
        )?;

        tracing::info!(
            sonarr = self.sonarr.is_some(),
            radarr = self.radarr.is_some(),
            "All clients connected"
        );
        Ok(())
    }

    /// Assemble the processor. Sonarr is reconciled before Radarr.
    pub fn into_processor(self, settings: &Settings, metrics: Arc<Metrics>) -> Processor {
        let mut processor = Processor::new(self.torrents, process_options(settings))
            .with_metrics(metrics);

        for service in [self.sonarr, self.radarr].into_iter().flatten() {
            let search_on_delete = settings.service(service.kind()).search_on_delete;
            processor = processor.with_service(service, search_on_delete);
        }
        processor
    }
}

fn arr_client(settings: &Settings, kind: ServiceKind) -> Result<Option<Arc<dyn QueueService>>> {
    let service = settings.service(kind);
    if !service.enabled {
        tracing::debug!("{} disabled", kind);
        return Ok(None);
    }

    let client = ArrClient::new(kind, &service.url, service.api_key, settings.request_timeout)
        .with_context(|| format!("Failed to build {} client", kind))?;
    Ok(Some(Arc::new(client)))
}

/// Connect a service if it is enabled.
async fn connect_optional(service: Option<&dyn QueueService>) -> Result<()> {
    let Some(service) = service else {
        return Ok(());
    };
    service
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}", service.kind()))
}

pub fn process_options(settings: &Settings) -> ProcessOptions {
    ProcessOptions {
        stall_duration: settings.stall_duration,
        only_labels: settings.only_labels.clone(),
        pretend: settings.pretend,
    }
}

/// Build, connect, and assemble everything the scheduler needs.
pub async fn bootstrap(settings: &Settings, metrics: Arc<Metrics>) -> Result<Processor> {
    let collaborators = Collaborators::from_settings(settings)?;
    collaborators.connect_all().await?;
    Ok(collaborators.into_processor(settings, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ClientError, MockQueueService, MockTorrentSource};

    fn torrents_ok() -> Arc<dyn TorrentSource> {
        let mut source = MockTorrentSource::new();
        source.expect_connect().times(1).returning(|| Ok(()));
        Arc::new(source)
    }

    fn service(kind: ServiceKind, ok: bool) -> Arc<dyn QueueService> {
        let mut service = MockQueueService::new();
        service.expect_kind().return_const(kind);
        service.expect_connect().times(1).returning(move || {
            if ok {
                Ok(())
            } else {
                Err(ClientError::Auth("rejected".into()))
            }
        });
        Arc::new(service)
    }

    #[tokio::test]
    async fn test_connect_all_skips_disabled_services() {
        let collaborators = Collaborators {
            torrents: torrents_ok(),
            sonarr: None,
            radarr: Some(service(ServiceKind::Radarr, true)),
        };
        collaborators.connect_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_failure_names_service() {
        let mut source = MockTorrentSource::new();
        source.expect_connect().returning(|| Ok(()));
        let collaborators = Collaborators {
            torrents: Arc::new(source),
            sonarr: Some(service(ServiceKind::Sonarr, true)),
            radarr: Some(service(ServiceKind::Radarr, false)),
        };

        let err = collaborators.connect_all().await.unwrap_err();
        let message = err.to_string();
        assert!(
            message.contains(&ServiceKind::Radarr.to_string()),
            "{message}"
        );
        assert!(!message.contains(&ServiceKind::Sonarr.to_string()), "{message}");
    }

    #[test]
    fn test_from_settings_builds_enabled_services_only() {
        let settings = Settings {
            radarr_enabled: true,
            radarr_api_key: "key".into(),
            ..Settings::default()
        };
        let collaborators = Collaborators::from_settings(&settings).unwrap();
        assert!(collaborators.sonarr.is_none());
        assert_eq!(
            collaborators.radarr.map(|service| service.kind()),
            Some(ServiceKind::Radarr)
        );
    }

    #[test]
    fn test_process_options_from_settings() {
        let settings = Settings {
            pretend: true,
            only_labels: vec!["tv".into()],
            ..Settings::default()
        };
        let options = process_options(&settings);
        assert!(options.pretend);
        assert_eq!(options.only_labels, vec!["tv"]);
        assert_eq!(options.stall_duration, settings.stall_duration);
    }
}
