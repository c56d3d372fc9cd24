//! Peer Replication Module
//!
//! Pushes every locally stored upload to the configured peers and receives the
//! files pushed by them.
//!
//! ## Semantics
//! - **Best effort**: one attempt per (peer × stored file). No retry, no backoff, no
//!   acknowledgement beyond a log line. Replicas may diverge.
//! - **Detached**: attempts run as independent tokio tasks that the uploading request
//!   never waits for and never cancels. Their number is unbounded.
//! - **Placement**: the sender forwards the normalized sub-path, so the receiver stores
//!   the file in the same relative directory and under the same name.
//!
//! ## Submodules
//! - **`dispatcher`**: Outbound side (`ReplicationDispatcher`).
//! - **`handlers`**: Inbound `/rsync` endpoint.
//! - **`types`**: Units of replication work and their outcome.

pub mod dispatcher;
pub mod handlers;
pub mod types;
