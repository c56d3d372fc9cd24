//! Helpers for tests that need live nodes.

use crate::config::StorageConfig;
use crate::server::serve;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub struct TestNode {
    pub addr: SocketAddr,
    pub root: TempDir,
    pub config: Arc<StorageConfig>,
}

impl TestNode {
    pub fn url(&self, endpoint: &str) -> String {
        format!("http://{}{}", self.addr, endpoint)
    }

    pub fn root_path(&self) -> &Path {
        self.root.path()
    }
}

/// Starts a node on an ephemeral port with a fresh storage root.
pub async fn spawn_node(peers: Vec<String>) -> TestNode {
    spawn_node_with(peers, serde_json::json!({})).await
}

/// Like `spawn_node`, with `overrides` merged over the generated configuration.
pub async fn spawn_node_with(peers: Vec<String>, overrides: serde_json::Value) -> TestNode {
    let root = tempfile::tempdir().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut settings = serde_json::json!({
        "addr": addr.to_string(),
        "path": root.path(),
        "fileNameLength": 12,
        "rysncAddr": peers,
    });
    if let (Some(base), serde_json::Value::Object(extra)) = (settings.as_object_mut(), overrides) {
        base.extend(extra);
    }

    let config = StorageConfig::from_json(&settings.to_string()).unwrap();
    let config = Arc::new(config);

    tokio::spawn(serve(listener, config.clone()));

    TestNode { addr, root, config }
}

/// Every regular file below `dir`, recursively.
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                found.push(path);
            }
        }
    }
    found.sort();
    found
}

/// Polls until `path` holds exactly `expected`, giving up after five seconds.
pub async fn wait_for_contents(path: &Path, expected: &[u8]) -> bool {
    for _ in 0..100 {
        if let Ok(contents) = std::fs::read(path) {
            if contents == expected {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
