//! HTTP Protocol
//!
//! Endpoints, headers and response bodies shared by uploaders, this node and its peers.
//! Every node speaks both sides: it accepts uploads on `/upload` and replicas on `/rsync`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- API Endpoints ---

/// Public endpoint for client uploads (multipart/form-data, any number of file parts).
pub const ENDPOINT_UPLOAD: &str = "/upload";
/// Endpoint receiving a single replicated file from a peer.
pub const ENDPOINT_RSYNC: &str = "/rsync";

// --- Headers ---

/// Base64-encoded sub-path under the storage root.
pub const HEADER_SUB_PATH: &str = "Path";
/// Client address set by a reverse proxy.
pub const HEADER_REAL_IP: &str = "X-Real-IP";

/// Form field name of the single part in a replication request.
pub const REPLICA_FIELD: &str = "rsyncfile";

// --- Data Transfer Objects ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseCode {
    Success,
    Error,
}

/// Body returned by `/upload`.
///
/// `results` maps `<field>@<original file name>` to the stored path relative to the
/// storage root, or to `null` when that part could not be stored. Entries keep the
/// arrival order of the parts. A key already taken by an earlier part of the same
/// request gets a `#2`, `#3`, ... suffix, so every part keeps its own entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub code: ResponseCode,
    pub results: Map<String, Value>,
}

impl UploadResponse {
    pub fn new() -> Self {
        Self {
            code: ResponseCode::Success,
            results: Map::new(),
        }
    }

    pub fn record_stored(&mut self, field: &str, file_name: &str, relative_path: &str) {
        let key = self.free_key(field, file_name);
        self.results.insert(key, Value::String(relative_path.to_string()));
    }

    /// Records a failed part. One failure turns the whole response into `error`.
    pub fn record_failed(&mut self, field: &str, file_name: &str) {
        let key = self.free_key(field, file_name);
        self.results.insert(key, Value::Null);
        self.code = ResponseCode::Error;
    }

    pub fn mark_error(&mut self) {
        self.code = ResponseCode::Error;
    }

    /// First unused key for this part: `field@name`, then `field@name#2`, ...
    fn free_key(&self, field: &str, file_name: &str) -> String {
        let base = result_key(field, file_name);
        if !self.results.contains_key(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let key = format!("{}#{}", base, n);
            if !self.results.contains_key(&key) {
                return key;
            }
            n += 1;
        }
    }
}

impl Default for UploadResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Body returned by `/rsync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaResponse {
    pub code: ResponseCode,
}

impl ReplicaResponse {
    pub fn success() -> Self {
        Self {
            code: ResponseCode::Success,
        }
    }

    pub fn error() -> Self {
        Self {
            code: ResponseCode::Error,
        }
    }
}

pub fn result_key(field: &str, file_name: &str) -> String {
    format!("{}@{}", field, file_name)
}
