//! Outbound replication.
//!
//! ## Responsibilities
//! - **Fan-out**: One task per configured peer for every stored file.
//! - **Transfer**: Re-uploads the file as a single-part multipart request, carrying the
//!   sub-path in the `Path` header.
//! - **Reporting**: Logs the peer's answer or the failure. Nothing is reported back to
//!   the uploader.

use super::types::{ReplicaOutcome, ReplicationTask};
use crate::config::StorageConfig;
use crate::error::ReplicationError;
use crate::protocol::{HEADER_SUB_PATH, REPLICA_FIELD, ReplicaResponse, ResponseCode};
use crate::storage::paths::encode_sub_path;
use crate::storage::writer::StoredFile;

use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::ReaderStream;

#[derive(Debug, Clone)]
pub struct ReplicationDispatcher {
    peers: Arc<[String]>,
    http_client: reqwest::Client,
    timeout: Option<Duration>,
}

impl ReplicationDispatcher {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            peers: config.peers().into(),
            http_client: reqwest::Client::new(),
            timeout: config.replication_timeout(),
        }
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    /// Launches one detached replication attempt per configured peer.
    pub fn fan_out(&self, sub_path: &str, stored: &StoredFile) {
        for peer in self.peers.iter() {
            self.dispatch(ReplicationTask {
                peer_url: peer.clone(),
                sub_path: sub_path.to_string(),
                local_path: stored.absolute_path.clone(),
            });
        }
    }

    /// Spawns the attempt and drops its handle: the caller never waits for it, cannot
    /// cancel it, and the attempt is never retried.
    pub fn dispatch(&self, task: ReplicationTask) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.run(task).await;
        });
    }

    async fn run(&self, task: ReplicationTask) {
        match self.replicate(&task).await {
            Ok(outcome) => {
                let rejected = serde_json::from_str::<ReplicaResponse>(&outcome.body)
                    .map(|r| r.code == ResponseCode::Error)
                    .unwrap_or(false);
                if rejected {
                    tracing::warn!(
                        "Clientrsyncfile {} rejected by {} {}: {}",
                        task.local_path.display(),
                        task.peer_url,
                        outcome.status,
                        outcome.body
                    );
                } else {
                    tracing::info!("Clientrsyncfile {} {}", outcome.status, outcome.body);
                }
            }
            Err(e) => {
                tracing::error!(
                    "Clientrsyncfile Error {} {}: {}",
                    task.peer_url,
                    task.local_path.display(),
                    e
                );
            }
        }
    }

    /// Performs one replication attempt and returns the peer's raw answer.
    pub async fn replicate(
        &self,
        task: &ReplicationTask,
    ) -> Result<ReplicaOutcome, ReplicationError> {
        let read_local = |source: std::io::Error| ReplicationError::ReadLocal {
            path: task.local_path.clone(),
            source,
        };
        let file = tokio::fs::File::open(&task.local_path).await.map_err(read_local)?;
        let length = file.metadata().await.map_err(read_local)?.len();
        let file_name = task
            .local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        // Streamed from disk, never buffered whole.
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, length).file_name(file_name);
        let form = Form::new().part(REPLICA_FIELD, part);
        let mut request = self.http_client.post(&task.peer_url).multipart(form);
        if !task.sub_path.is_empty() {
            request = request.header(HEADER_SUB_PATH, encode_sub_path(&task.sub_path));
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(ReplicaOutcome { status, body })
    }
}
