//! HTTP Server Assembly
//!
//! Builds the axum router shared by the binary and the end-to-end tests, and
//! resolves the client address used in per-request log lines.

use crate::config::StorageConfig;
use crate::ingestion::handlers::handle_upload;
use crate::protocol::{ENDPOINT_RSYNC, ENDPOINT_UPLOAD, HEADER_REAL_IP};
use crate::replication::dispatcher::ReplicationDispatcher;
use crate::replication::handlers::handle_rsync;

use axum::extract::{ConnectInfo, DefaultBodyLimit, Extension};
use axum::http::HeaderMap;
use axum::{Router, routing::post};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub fn router(config: Arc<StorageConfig>) -> Router {
    let dispatcher = Arc::new(ReplicationDispatcher::new(&config));
    let body_limit = match config.max_body_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route(ENDPOINT_UPLOAD, post(handle_upload))
        .route(ENDPOINT_RSYNC, post(handle_rsync))
        .layer(body_limit)
        .layer(Extension(dispatcher))
        .layer(Extension(config))
}

/// Serves `router` on `listener` until the server fails.
pub async fn serve(listener: TcpListener, config: Arc<StorageConfig>) -> std::io::Result<()> {
    let app = router(config);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

/// Client address for logs: the reverse proxy's `X-Real-IP` when present, otherwise
/// the peer address of the connection.
pub fn client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    if let Some(ip) = headers
        .get(HEADER_REAL_IP)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return ip.to_string();
    }

    match connect_info {
        Some(ConnectInfo(addr)) => addr.to_string(),
        None => "unknown".to_string(),
    }
}
