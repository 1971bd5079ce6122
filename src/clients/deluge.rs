use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{ClientError, Result, TorrentSource};
use crate::models::{TorrentSnapshot, TorrentState};

const STATUS_KEYS: [&str; 6] = [
    "name",
    "eta",
    "total_done",
    "completed_time",
    "time_added",
    "state",
];

/// Deluge Web UI JSON-RPC client.
///
/// Talks to `<base_url>/json`. The session cookie set by `auth.login` is kept
/// by reqwest's cookie store, so every call after [`TorrentSource::connect`]
/// is authenticated.
pub struct DelugeClient {
    client: Client,
    endpoint: String,
    password: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: i64,
}

/// Subset of `core.get_torrents_status` fields we ask for.
#[derive(Debug, Deserialize)]
struct DelugeStatus {
    #[serde(default)]
    name: String,
    #[serde(default)]
    eta: f64,
    #[serde(default)]
    total_done: f64,
    #[serde(default)]
    completed_time: f64,
    #[serde(default)]
    time_added: f64,
    #[serde(default)]
    state: TorrentState,
}

impl DelugeStatus {
    fn into_snapshot(self, id: String) -> TorrentSnapshot {
        TorrentSnapshot {
            id,
            name: self.name,
            eta: self.eta as i64,
            total_done: self.total_done.max(0.0) as u64,
            completed_time: self.completed_time as i64,
            time_added: self.time_added,
            state: self.state,
        }
    }
}

/// `label` is only present while the Label plugin is enabled.
#[derive(Debug, Deserialize)]
struct LabelStatus {
    label: Option<String>,
}

impl DelugeClient {
    pub fn new(base_url: &str, password: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/json", base_url.trim_end_matches('/')),
            password: password.into(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "method": method, "params": params, "id": id });

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status_code: status.as_u16(),
                message,
            });
        }

        let envelope: RpcResponse = response.json().await?;
        decode_result(method, envelope)
    }

    async fn login(&self) -> Result<()> {
        let ok: bool = self.call("auth.login", json!([self.password])).await?;
        if !ok {
            return Err(ClientError::Auth("Deluge rejected the web password".into()));
        }
        tracing::debug!("Logged in to Deluge Web");
        Ok(())
    }

    /// Make sure the web UI is attached to a daemon, connecting to the first
    /// configured host if it is not.
    async fn ensure_daemon(&self) -> Result<()> {
        let connected: bool = self.call("web.connected", json!([])).await?;
        if connected {
            return Ok(());
        }

        let hosts: Vec<Vec<Value>> = self.call("web.get_hosts", json!([])).await?;
        let host_id = first_host_id(&hosts).ok_or_else(|| {
            ClientError::Unexpected("Deluge Web has no daemon hosts configured".into())
        })?;

        let _: Value = self.call("web.connect", json!([host_id])).await?;
        tracing::info!("Connected Deluge Web to daemon {}", host_id);
        Ok(())
    }
}

fn decode_result<T: DeserializeOwned>(method: &str, envelope: RpcResponse) -> Result<T> {
    if let Some(error) = envelope.error {
        return Err(ClientError::Rpc {
            method: method.to_string(),
            code: error.code,
            message: error.message,
        });
    }
    serde_json::from_value(envelope.result)
        .map_err(|e| ClientError::Unexpected(format!("{method}: {e}")))
}

fn first_host_id(hosts: &[Vec<Value>]) -> Option<String> {
    hosts
        .first()
        .and_then(|host| host.first())
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn label_of(id: &str, status: Option<LabelStatus>) -> Result<String> {
    let status = status
        .ok_or_else(|| ClientError::Unexpected(format!("torrent {id} missing from label query")))?;
    status.label.ok_or_else(|| {
        ClientError::Unexpected(format!(
            "no label reported for torrent {id}; is the Deluge Label plugin enabled?"
        ))
    })
}

fn into_snapshots(statuses: HashMap<String, DelugeStatus>) -> Vec<TorrentSnapshot> {
    let mut snapshots: Vec<_> = statuses
        .into_iter()
        .map(|(id, status)| status.into_snapshot(id))
        .collect();
    snapshots.sort_by(|a, b| a.id.cmp(&b.id));
    snapshots
}

#[async_trait]
impl TorrentSource for DelugeClient {
    async fn connect(&self) -> Result<()> {
        self.login().await?;
        self.ensure_daemon().await
    }

    async fn list_downloading(&self) -> Result<Vec<TorrentSnapshot>> {
        let statuses: HashMap<String, DelugeStatus> = self
            .call(
                "core.get_torrents_status",
                json!([{ "state": "Downloading" }, STATUS_KEYS]),
            )
            .await?;
        Ok(into_snapshots(statuses))
    }

    async fn get_label(&self, id: &str) -> Result<String> {
        let mut statuses: HashMap<String, LabelStatus> = self
            .call(
                "core.get_torrents_status",
                json!([{ "id": [id] }, ["label"]]),
            )
            .await?;
        label_of(id, statuses.remove(id))
    }
}
