//! Node Configuration
//!
//! Loaded once at startup from a JSON file and shared read-only (`Arc<StorageConfig>`)
//! with every handler. The accepted keys match the file format used by existing
//! deployments:
//!
//! ```json
//! {
//!   "addr": "0.0.0.0:9090",
//!   "path": "/var/upload/www/",
//!   "fileNameLength": 11,
//!   "rysncAddr": ["http://localhost:9091/rsync", "http://localhost:9092/rsync"]
//! }
//! ```

use crate::error::ConfigError;
use crate::storage::paths::collapse_separators;

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Listen address of the HTTP server.
    pub addr: String,
    /// Storage root. Always absolute and ending in exactly one `/` after `validate`.
    pub path: String,
    /// Length of generated file names (extension excluded).
    pub file_name_length: usize,
    /// Replication endpoints of the peer nodes, in dispatch order.
    #[serde(default, alias = "peers")]
    pub rysnc_addr: Vec<String>,
    /// Upper bound on request bodies. `None` lifts the framework default entirely.
    #[serde(default)]
    pub max_body_bytes: Option<usize>,
    /// Timeout for one outbound replication request. `None` waits indefinitely.
    #[serde(default)]
    pub replication_timeout_secs: Option<u64>,
}

impl StorageConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: StorageConfig = serde_json::from_str(raw)?;
        config.validate()
    }

    fn validate(mut self) -> Result<Self, ConfigError> {
        if !Path::new(&self.path).is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "storage path must be absolute, got {:?}",
                self.path
            )));
        }
        if self.file_name_length == 0 {
            return Err(ConfigError::Invalid(
                "fileNameLength must be positive".to_string(),
            ));
        }
        for peer in &self.rysnc_addr {
            let parsed = url::Url::parse(peer)
                .map_err(|e| ConfigError::Invalid(format!("peer url {:?}: {}", peer, e)))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::Invalid(format!(
                    "peer url {:?} must use http or https",
                    peer
                )));
            }
        }

        self.path = collapse_separators(&format!("{}/", self.path));
        Ok(self)
    }

    pub fn peers(&self) -> &[String] {
        &self.rysnc_addr
    }

    pub fn replication_timeout(&self) -> Option<Duration> {
        self.replication_timeout_secs.map(Duration::from_secs)
    }
}
