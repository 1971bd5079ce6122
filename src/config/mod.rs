use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::fs;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "unstall.yaml";

/// Dotenv file read from the working directory.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Environment variables of the original Deluge daemon client. Deluge is now
/// reached through its web UI, configured with `DELUGE_URL`.
const LEGACY_DELUGE_VARS: [&str; 3] = ["DELUGE_HOST", "DELUGE_PORT", "DELUGE_USERNAME"];

/// Loads [`Settings`] from layered sources.
///
/// Precedence, lowest first:
/// - built-in defaults ([`Settings::default`])
/// - a YAML file (explicit path, or `unstall.yaml` if present)
/// - variables from a `.env` file, if present
/// - environment variables named after the fields (`STALL_DURATION`, `SONARR_API_KEY`, ...)
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: Utf8PathBuf,
    required: bool,
    env_file: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager.
    ///
    /// # Arguments
    /// * `config_path` - Explicit YAML file, which must then exist. `None` falls
    ///   back to an optional [`DEFAULT_CONFIG_FILE`].
    pub fn new(config_path: Option<Utf8PathBuf>) -> Self {
        match config_path {
            Some(path) => Self {
                config_path: path,
                required: true,
                env_file: Utf8PathBuf::from(DEFAULT_ENV_FILE),
            },
            None => Self {
                config_path: Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
                required: false,
                env_file: Utf8PathBuf::from(DEFAULT_ENV_FILE),
            },
        }
    }

    /// Read dotenv variables from `path` instead of `./.env`.
    pub fn with_env_file(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.env_file = path.into();
        self
    }

    /// Load settings from the file, the `.env` file and the process environment.
    ///
    /// Process variables win over `.env` entries with the same name.
    pub fn load(&self) -> Result<Settings> {
        let mut env = read_env_file(&self.env_file);
        env.extend(std::env::vars_os().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        }));
        self.load_with_env(Some(env))
    }

    /// Load settings, reading environment variables from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(&self, env: Option<HashMap<String, String>>) -> Result<Settings> {
        if self.required && !self.config_path.exists() {
            anyhow::bail!("Config file not found: {}", self.config_path);
        }
        if self.config_path.exists() {
            tracing::info!("Loading config from {}", self.config_path);
        }
        for key in legacy_deluge_vars(env.as_ref()) {
            tracing::warn!(
                "{} is no longer used; set DELUGE_URL to the Deluge web UI address instead",
                key
            );
        }

        let environment = Environment::default()
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("only_labels")
            .source(env);

        let config = Config::builder()
            .add_source(
                File::from(self.config_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read configuration ({})", self.config_path))?;

        let mut settings: Settings = config
            .try_deserialize()
            .context("Failed to parse configuration")?;
        settings.normalize();

        Ok(settings)
    }

    /// Write the default settings as a YAML template.
    ///
    /// # Arguments
    /// * `path` - Destination file; parent directories are created
    pub fn write_template<P: AsRef<Utf8Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent))?;
        }

        let yaml_string = serde_yaml_ng::to_string(&Settings::default())
            .context("Failed to serialize settings to YAML")?;

        fs::write(path, yaml_string)
            .with_context(|| format!("Failed to write config template: {}", path))?;

        tracing::info!("Wrote config template to {}", path);
        Ok(())
    }

    /// Path of the YAML file this manager reads.
    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}

/// Variables from a dotenv file. A missing file yields nothing; an unreadable
/// one is logged and skipped.
fn read_env_file(path: &Utf8Path) -> HashMap<String, String> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(err) if err.not_found() => {
            tracing::debug!("No env file at {}", path);
            return HashMap::new();
        }
        Err(err) => {
            tracing::warn!("Error loading {} file: {}", path, err);
            return HashMap::new();
        }
    };

    let mut vars = HashMap::new();
    for entry in entries {
        match entry {
            Ok((key, value)) => {
                vars.insert(key, value);
            }
            Err(err) => {
                tracing::warn!("Error loading {} file: {}", path, err);
                return HashMap::new();
            }
        }
    }
    tracing::debug!("Loaded {} variables from {}", vars.len(), path);
    vars
}

/// Legacy Deluge variables that are set, in declaration order.
fn legacy_deluge_vars(env: Option<&HashMap<String, String>>) -> Vec<&'static str> {
    LEGACY_DELUGE_VARS
        .into_iter()
        .filter(|key| match env {
            Some(env) => env.contains_key(*key),
            None => std::env::var_os(key).is_some(),
        })
        .collect()
}
