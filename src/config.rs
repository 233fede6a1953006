//! # Pipeline Configuration ([`PipelineConfig`]) - Environment-driven settings.
//!
//! The pipeline reads its backend locations and working directories from the
//! environment, matching the deployment convention of the wider BODS infrastructure:
//!
//! - `ELASTICSEARCH_PROTOCOL` / `ELASTICSEARCH_HOST` / `ELASTICSEARCH_PORT` /
//!   `ELASTICSEARCH_PASSWORD` — the document store holding raw records, published
//!   statements and the auxiliary indexes;
//! - `REDIS_HOST` / `REDIS_PORT` — optional key/value store location;
//! - `BODS_AWS_REGION` / `BODS_AWS_ACCESS_KEY_ID` / `BODS_AWS_SECRET_ACCESS_KEY` —
//!   stream-broker region and credentials;
//! - `BODS_DATA_DIR` — cache directory for downloaded source files;
//! - `BODS_STATUS_DIR` — directory holding last-run status markers.
//!
//! Unset keys fall back to local-development defaults, mirroring
//! [`PipelineConfig::default`]. All values are plain data; the clients that consume
//! them are injected into the stages, so tests never need the environment.

use std::env;
use std::path::PathBuf;

/// Settings for a pipeline run, usually read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Document store protocol (`http` or `https`).
    pub elasticsearch_protocol: String,
    /// Document store host name.
    pub elasticsearch_host: String,
    /// Document store port.
    pub elasticsearch_port: u16,
    /// Optional password for the `elastic` user.
    pub elasticsearch_password: Option<String>,
    /// Optional key/value store host name.
    pub redis_host: Option<String>,
    /// Optional key/value store port.
    pub redis_port: Option<u16>,
    /// Stream-broker region.
    pub broker_region: Option<String>,
    /// Stream-broker access key id.
    pub broker_access_key_id: Option<String>,
    /// Stream-broker secret access key.
    pub broker_secret_access_key: Option<String>,
    /// Cache directory for downloaded source files.
    pub data_dir: PathBuf,
    /// Directory holding last-run status markers.
    pub status_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            elasticsearch_protocol: String::from("http"),
            elasticsearch_host: String::from("localhost"),
            elasticsearch_port: 9200,
            elasticsearch_password: None,
            redis_host: None,
            redis_port: None,
            broker_region: None,
            broker_access_key_id: None,
            broker_secret_access_key: None,
            data_dir: PathBuf::from("data"),
            status_dir: PathBuf::from("data/status"),
        }
    }
}

impl PipelineConfig {
    /// Builds a configuration from the environment, falling back to the defaults
    /// for unset keys. Ports that fail to parse are treated as unset.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            elasticsearch_protocol: env::var("ELASTICSEARCH_PROTOCOL")
                .unwrap_or(defaults.elasticsearch_protocol),
            elasticsearch_host: env::var("ELASTICSEARCH_HOST")
                .unwrap_or(defaults.elasticsearch_host),
            elasticsearch_port: env::var("ELASTICSEARCH_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.elasticsearch_port),
            elasticsearch_password: env::var("ELASTICSEARCH_PASSWORD").ok(),
            redis_host: env::var("REDIS_HOST").ok(),
            redis_port: env::var("REDIS_PORT").ok().and_then(|port| port.parse().ok()),
            broker_region: env::var("BODS_AWS_REGION").ok(),
            broker_access_key_id: env::var("BODS_AWS_ACCESS_KEY_ID").ok(),
            broker_secret_access_key: env::var("BODS_AWS_SECRET_ACCESS_KEY").ok(),
            data_dir: env::var("BODS_DATA_DIR")
                .map_or(defaults.data_dir, PathBuf::from),
            status_dir: env::var("BODS_STATUS_DIR")
                .map_or(defaults.status_dir, PathBuf::from),
        }
    }

    /// The document store base URL, e.g. `http://localhost:9200`.
    #[must_use]
    pub fn elasticsearch_url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.elasticsearch_protocol, self.elasticsearch_host, self.elasticsearch_port
        )
    }
}
