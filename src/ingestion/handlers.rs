use crate::config::StorageConfig;
use crate::protocol::{HEADER_SUB_PATH, UploadResponse};
use crate::replication::dispatcher::ReplicationDispatcher;
use crate::server::client_ip;
use crate::storage::paths::{self, ResolvedDir};
use crate::storage::writer::{CopyError, StorageWriter, StoredFile, copy_field, extension_of};

use axum::Json;
use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{ConnectInfo, Extension, Multipart};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;

pub async fn handle_upload(
    Extension(config): Extension<Arc<StorageConfig>>,
    Extension(dispatcher): Extension<Arc<ReplicationDispatcher>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let client = client_ip(&headers, connect_info.as_ref());

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => {
            tracing::error!("{} uploadfile MultipartReadError: {}", client, e.body_text());
            return (StatusCode::INTERNAL_SERVER_ERROR, e.body_text()).into_response();
        }
    };

    let encoded = headers
        .get(HEADER_SUB_PATH)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let target = paths::resolve(&config.path, encoded);
    let writer = StorageWriter::new(&config);

    let mut response = UploadResponse::new();
    let mut parts_read = 0usize;

    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if parts_read == 0 => {
                tracing::error!("{} uploadfile MultipartReadError: {}", client, e);
                return (StatusCode::INTERNAL_SERVER_ERROR, e.body_text()).into_response();
            }
            Err(e) => {
                tracing::error!(
                    "{} uploadfile MultipartReadError after {} parts: {}",
                    client,
                    parts_read,
                    e
                );
                response.mark_error();
                break;
            }
        };
        parts_read += 1;

        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            // Not a file field.
            _ => continue,
        };

        match store_part(&writer, &target, &mut field, &file_name).await {
            Ok(stored) => {
                tracing::info!(
                    "{} uploadfile [{}][{}] > {}",
                    client,
                    field_name,
                    file_name,
                    stored.absolute_path.display()
                );
                response.record_stored(&field_name, &file_name, &stored.relative_path);
                dispatcher.fan_out(&target.sub_path, &stored);
            }
            Err(CopyError::Storage(e)) => {
                tracing::error!(
                    "{} uploadfile [{}][{}] {}: {}",
                    client,
                    field_name,
                    file_name,
                    e.kind(),
                    e
                );
                response.record_failed(&field_name, &file_name);
            }
            Err(CopyError::Body(e)) => {
                tracing::error!(
                    "{} uploadfile [{}][{}] MultipartReadError: {}",
                    client,
                    field_name,
                    file_name,
                    e
                );
                response.record_failed(&field_name, &file_name);
                break;
            }
        }
    }

    Json(response).into_response()
}

async fn store_part(
    writer: &StorageWriter,
    target: &ResolvedDir,
    field: &mut Field<'_>,
    file_name: &str,
) -> Result<StoredFile, CopyError> {
    let mut claimed = writer.claim(&target.dir(), extension_of(file_name)).await?;

    if let Err(e) = copy_field(field, &mut claimed).await {
        claimed.discard().await;
        return Err(e);
    }

    Ok(claimed.finish(target).await?)
}
