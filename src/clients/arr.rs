use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;

use super::{ClientError, QueueService, Result};
use crate::models::{QueueRecord, RemoveOptions, ServiceKind};

const API_KEY_HEADER: &str = "X-Api-Key";

/// Sonarr / Radarr v3 API client.
///
/// Both services share the queue and command endpoints; the differences
/// (media id field, blocklist parameter, search command) come from
/// [`ServiceKind`].
pub struct ArrClient {
    client: Client,
    kind: ServiceKind,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemStatus {
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueuePage {
    #[serde(default)]
    total_records: i64,
    #[serde(default)]
    records: Vec<QueueResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueueResource {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    episode_id: Option<i64>,
    #[serde(default)]
    movie_id: Option<i64>,
}

impl QueueResource {
    fn into_record(self, kind: ServiceKind) -> Option<QueueRecord> {
        let media_id = match kind {
            ServiceKind::Sonarr => self.episode_id,
            ServiceKind::Radarr => self.movie_id,
        };
        // Untitled entries can never match a torrent name.
        let title = self.title.filter(|title| !title.is_empty())?;
        Some(QueueRecord {
            id: self.id,
            title,
            media_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    status: String,
}

impl ArrClient {
    pub fn new(
        kind: ServiceKind,
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            kind,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v3{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.api_key)
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::Auth(format!("{} rejected the API key", self.kind)));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status_code: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    /// GET /api/v3/queue
    async fn queue_page(&self, page_size: i64) -> Result<QueuePage> {
        let request = self
            .client
            .get(self.url("/queue"))
            .query(&[("page", 1), ("pageSize", page_size)]);
        let response = self.authed(request).send().await?;
        self.handle_response(response).await
    }
}

/// JSON body of a replacement-search command.
fn search_command_body(kind: ServiceKind, media_ids: &[i64]) -> Value {
    let mut body = Map::new();
    body.insert("name".into(), Value::from(kind.search_command()));
    body.insert(kind.search_ids_field().into(), Value::from(media_ids.to_vec()));
    Value::Object(body)
}

/// Query parameters for deleting a queue record.
///
/// `removeFromClient` is only sent when set, so the service default applies otherwise.
fn remove_query(kind: ServiceKind, options: RemoveOptions) -> Vec<(&'static str, bool)> {
    let mut query = vec![(kind.blocklist_param(), options.blocklist)];
    if options.remove_from_client {
        query.push(("removeFromClient", true));
    }
    query
}

#[async_trait]
impl QueueService for ArrClient {
    fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// GET /api/v3/system/status
    async fn connect(&self) -> Result<()> {
        let request = self.client.get(self.url("/system/status"));
        let response = self.authed(request).send().await?;
        let status: SystemStatus = self.handle_response(response).await?;
        tracing::info!("Connected to {} v{} at {}", self.kind, status.version, self.base_url);
        Ok(())
    }

    /// Reads the record count first, then fetches everything in one page.
    async fn list_queue(&self) -> Result<Vec<QueueRecord>> {
        let first = self.queue_page(1).await?;
        if first.total_records <= 0 {
            return Ok(Vec::new());
        }

        let page = if first.total_records as usize <= first.records.len() {
            first
        } else {
            self.queue_page(first.total_records).await?
        };

        let kind = self.kind;
        Ok(page
            .records
            .into_iter()
            .filter_map(|resource| resource.into_record(kind))
            .collect())
    }

    /// DELETE /api/v3/queue/{id}
    async fn remove_queue_record(&self, record: &QueueRecord, options: RemoveOptions) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/queue/{}", record.id)))
            .query(&remove_query(self.kind, options));
        let response = self.authed(request).send().await?;
        self.check_status(response).await?;
        Ok(())
    }

    /// POST /api/v3/command
    async fn trigger_search(&self, media_ids: &[i64]) -> Result<String> {
        let request = self
            .client
            .post(self.url("/command"))
            .json(&search_command_body(self.kind, media_ids));
        let response = self.authed(request).send().await?;
        let command: CommandResponse = self.handle_response(response).await?;
        Ok(command.status)
    }
}
