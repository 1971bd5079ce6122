use camino::Utf8PathBuf;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;

use super::queue::ServiceKind;

/// Errors raised while reading or validating settings.
///
/// Every variant is fatal at startup, before any cycle runs.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid duration {0:?} (expected e.g. \"90s\", \"10m\", \"1h30m\")")]
    InvalidDuration(String),

    #[error("{0} is enabled but {1} is not set")]
    MissingServiceSetting(ServiceKind, &'static str),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Deluge URL is not set")]
    MissingDelugeUrl,
}

/// Connection and behaviour settings for one queue service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub enabled: bool,
    pub url: String,
    pub api_key: String,
    pub search_on_delete: bool,
}

/// Runtime settings.
///
/// Field names double as the lowercased environment variable names
/// (`SONARR_ENABLED` -> `sonarr_enabled`), so the struct is deliberately flat.
/// Missing keys fall back to [`Settings::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub deluge_url: String,
    pub deluge_password: String,

    pub sonarr_enabled: bool,
    pub sonarr_url: String,
    pub sonarr_api_key: String,
    pub sonarr_search_on_delete: bool,

    pub radarr_enabled: bool,
    pub radarr_url: String,
    pub radarr_api_key: String,
    pub radarr_search_on_delete: bool,

    /// Only torrents carrying one of these Deluge labels are considered.
    /// Empty means every torrent.
    pub only_labels: Vec<String>,

    #[serde(with = "duration_str")]
    pub refresh_duration: Duration,

    #[serde(with = "duration_str")]
    pub stall_duration: Duration,

    #[serde(with = "duration_str")]
    pub request_timeout: Duration,

    pub pretend: bool,
    pub run_on_startup: bool,
    pub debug: bool,

    pub log_dir: Option<Utf8PathBuf>,
    pub log_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            deluge_url: "http://localhost:8112".to_string(),
            deluge_password: "deluge".to_string(),
            sonarr_enabled: false,
            sonarr_url: "http://localhost:8989".to_string(),
            sonarr_api_key: String::new(),
            sonarr_search_on_delete: false,
            radarr_enabled: false,
            radarr_url: "http://localhost:7878".to_string(),
            radarr_api_key: String::new(),
            radarr_search_on_delete: false,
            only_labels: Vec::new(),
            refresh_duration: Duration::from_secs(10 * 60),
            stall_duration: Duration::from_secs(60 * 60),
            request_timeout: Duration::from_secs(2 * 60),
            pretend: false,
            run_on_startup: true,
            debug: false,
            log_dir: None,
            log_json: false,
        }
    }
}

impl Settings {
    /// Settings for one downstream service.
    pub fn service(&self, kind: ServiceKind) -> ServiceSettings {
        match kind {
            ServiceKind::Sonarr => ServiceSettings {
                enabled: self.sonarr_enabled,
                url: self.sonarr_url.clone(),
                api_key: self.sonarr_api_key.clone(),
                search_on_delete: self.sonarr_search_on_delete,
            },
            ServiceKind::Radarr => ServiceSettings {
                enabled: self.radarr_enabled,
                url: self.radarr_url.clone(),
                api_key: self.radarr_api_key.clone(),
                search_on_delete: self.radarr_search_on_delete,
            },
        }
    }

    /// Trim label entries and drop empty ones (`ONLY_LABELS=""` yields `[""]`).
    pub fn normalize(&mut self) {
        self.only_labels = self
            .only_labels
            .iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
    }

    /// Reject combinations that can never work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deluge_url.trim().is_empty() {
            return Err(ConfigError::MissingDelugeUrl);
        }
        if self.refresh_duration.is_zero() {
            return Err(ConfigError::ZeroDuration("refresh_duration"));
        }

        for kind in ServiceKind::ALL {
            let service = self.service(kind);
            if !service.enabled {
                continue;
            }
            if service.url.trim().is_empty() {
                return Err(ConfigError::MissingServiceSetting(kind, "url"));
            }
            if service.api_key.trim().is_empty() {
                return Err(ConfigError::MissingServiceSetting(kind, "api_key"));
            }
        }

        Ok(())
    }
}

static DURATION_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)(ns|us|µs|ms|s|m|h)").expect("Invalid duration regex")
});

/// Parse a Go-style duration string such as `1h30m` or `250ms`.
///
/// A bare integer is read as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let text = input.trim();
    let invalid = || ConfigError::InvalidDuration(input.to_string());

    if text.is_empty() {
        return Err(invalid());
    }
    if let Ok(secs) = text.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total_nanos = 0f64;
    let mut consumed = 0;
    for caps in DURATION_PART.captures_iter(text) {
        let whole = caps.get(0).ok_or_else(invalid)?;
        // Parts must be contiguous: "1h x 2m" is rejected.
        if whole.start() != consumed {
            return Err(invalid());
        }
        consumed = whole.end();

        let value: f64 = caps[1].parse().map_err(|_| invalid())?;
        let nanos_per_unit = match &caps[2] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return Err(invalid()),
        };
        total_nanos += value * nanos_per_unit;
    }

    if consumed != text.len() || total_nanos >= u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Render a duration the way [`parse_duration`] reads it back.
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }
    if duration.subsec_nanos() != 0 {
        return format!("{}ms", duration.as_millis());
    }

    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if seconds > 0 {
        out.push_str(&format!("{seconds}s"));
    }
    out
}

mod duration_str {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
        }
    }
}
