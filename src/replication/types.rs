use std::path::PathBuf;

/// One unit of fire-and-forget replication work.
///
/// Created per (peer × stored file) pair and dropped once the single attempt finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationTask {
    /// Replication endpoint of the peer (its `/rsync` URL).
    pub peer_url: String,
    /// Normalized sub-path the file was stored under. Empty for the storage root.
    pub sub_path: String,
    /// Absolute path of the local copy.
    pub local_path: PathBuf,
}

/// What the peer answered to a replication attempt.
#[derive(Debug, Clone)]
pub struct ReplicaOutcome {
    pub status: u16,
    pub body: String,
}
