use config::Config;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::client::Client;
use crate::core::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_CONFIG_FILE: &str = "jikjik.toml";
const ENV_PREFIX: &str = "JIKJIK";

#[derive(Debug, Deserialize, Clone)]
pub struct Args {
    /// Injected API base URL. Takes precedence over anything the server says.
    pub api_base_url: Option<String>,
    /// Origin serving `/api/config`, consulted when no base URL is injected.
    pub config_origin: Option<String>,
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub request_timeout_secs: Option<u64>,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("jikjik-storage.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Args {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Reads `jikjik.toml` (or `config_file`, which must then exist) and
/// `JIKJIK_*` environment variables, the latter winning.
pub fn load(config_file: Option<&Path>) -> Result<Args, ConfigError> {
    let file = match config_file {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let config = Config::builder()
        .add_source(file)
        .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()?;

    Ok(config.try_deserialize::<Args>()?)
}

/// Picks the API base URL: injected value, then the server's `/api/config`,
/// then [`DEFAULT_API_BASE_URL`].
pub async fn resolve_base_url(args: &Args, client: &Client) -> String {
    if let Some(url) = non_empty(args.api_base_url.as_deref()) {
        tracing::debug!("Using configured API URL {}", url);
        return url.to_string();
    }

    if let Some(origin) = non_empty(args.config_origin.as_deref()) {
        if let Some(remote) = client.fetch_remote_config(origin).await {
            if let Some(url) = non_empty(remote.api_base_url.as_deref()) {
                tracing::info!("Using API URL from server config {}", url);
                return url.to_string();
            }
        }
    }

    tracing::debug!("Using default API URL {}", DEFAULT_API_BASE_URL);
    DEFAULT_API_BASE_URL.to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
