use crate::config::StorageConfig;
use crate::protocol::{HEADER_SUB_PATH, REPLICA_FIELD, ReplicaResponse};
use crate::server::client_ip;
use crate::storage::paths;
use crate::storage::writer::{StorageWriter, copy_field};

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{ConnectInfo, Extension, Multipart};
use axum::http::HeaderMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// Stores one file pushed by a peer, verbatim and without overwriting.
///
/// The file lands in the directory the forwarded `Path` header resolves to, under the
/// name the sender stored it with.
pub async fn handle_rsync(
    Extension(config): Extension<Arc<StorageConfig>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<ReplicaResponse> {
    let client = client_ip(&headers, connect_info.as_ref());

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => {
            tracing::warn!("{} rsyncfile  FormParseError: {}", client, e.body_text());
            return Json(ReplicaResponse::error());
        }
    };

    let mut field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(REPLICA_FIELD) => break field,
            Ok(Some(_)) => continue,
            Ok(None) => {
                tracing::warn!("{} rsyncfile  FormParseError: no {} part", client, REPLICA_FIELD);
                return Json(ReplicaResponse::error());
            }
            Err(e) => {
                tracing::warn!("{} rsyncfile  FormParseError: {}", client, e);
                return Json(ReplicaResponse::error());
            }
        }
    };

    let file_name = field.file_name().unwrap_or_default().to_string();
    if file_name.is_empty() {
        tracing::warn!("{} rsyncfile  FormParseError: missing file name", client);
        return Json(ReplicaResponse::error());
    }

    let encoded = headers
        .get(HEADER_SUB_PATH)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let target = paths::resolve(&config.path, encoded);

    let writer = StorageWriter::new(&config);
    let mut claimed = match writer.claim_exact(&target.dir(), &file_name).await {
        Ok(claimed) => claimed,
        Err(e) => {
            tracing::warn!("{} rsyncfile {} {}", client, file_name, e.kind());
            return Json(ReplicaResponse::error());
        }
    };

    if let Err(e) = copy_field(&mut field, &mut claimed).await {
        claimed.discard().await;
        tracing::error!("{} rsyncfile {} WriteError: {}", client, file_name, e);
        return Json(ReplicaResponse::error());
    }

    match claimed.finish(&target).await {
        Ok(stored) => {
            tracing::info!(
                "{} rsyncfile {} RsyncSuccess > {}",
                client,
                file_name,
                stored.absolute_path.display()
            );
            Json(ReplicaResponse::success())
        }
        Err(e) => {
            tracing::error!("{} rsyncfile {} {}: {}", client, file_name, e.kind(), e);
            Json(ReplicaResponse::error())
        }
    }
}
