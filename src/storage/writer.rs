use super::names;
use super::paths::ResolvedDir;
use crate::config::StorageConfig;
use crate::error::StorageError;

use axum::extract::multipart::{Field, MultipartError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Claims destination files under the storage root.
///
/// Existence is decided by the local filesystem alone: every claim is an exclusive
/// create, so two concurrent claims can never be handed the same path.
#[derive(Debug, Clone)]
pub struct StorageWriter {
    name_length: usize,
}

/// A file created for exclusive use by one upload part or replica.
#[derive(Debug)]
pub struct ClaimedFile {
    pub file_name: String,
    pub path: PathBuf,
    file: File,
    written: u64,
}

/// Outcome of persisting one upload part or replica. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Name of the file inside its directory.
    pub file_name: String,
    pub absolute_path: PathBuf,
    /// Path relative to the storage root, as reported to the uploader.
    pub relative_path: String,
    pub size: u64,
}

#[derive(Error, Debug)]
pub enum CopyError {
    /// The request body failed mid-part. The rest of the body is unusable.
    #[error("Failed to read request body: {0}")]
    Body(#[from] MultipartError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StorageWriter {
    pub fn new(config: &StorageConfig) -> Self {
        Self::with_name_length(config.file_name_length)
    }

    pub fn with_name_length(name_length: usize) -> Self {
        Self { name_length }
    }

    /// Ensures `dir` exists, then claims a fresh `<generated><extension>` file in it.
    pub async fn claim(&self, dir: &Path, extension: &str) -> Result<ClaimedFile, StorageError> {
        ensure_dir(dir).await?;

        loop {
            let file_name = format!("{}{}", names::generate(self.name_length)?, extension);
            let path = dir.join(&file_name);
            match create_new(&path).await {
                Ok(file) => return Ok(ClaimedFile::new(file_name, path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!("Generated name {} already taken, drawing again", file_name);
                    continue;
                }
                Err(source) => return Err(StorageError::CreateFile { path, source }),
            }
        }
    }

    /// Ensures `dir` exists, then creates `file_name` in it verbatim.
    ///
    /// Fails with `FileExists` instead of overwriting.
    pub async fn claim_exact(
        &self,
        dir: &Path,
        file_name: &str,
    ) -> Result<ClaimedFile, StorageError> {
        let file_name = base_file_name(file_name)?;
        ensure_dir(dir).await?;

        let path = dir.join(&file_name);
        match create_new(&path).await {
            Ok(file) => Ok(ClaimedFile::new(file_name, path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StorageError::FileExists(path)),
            Err(source) => Err(StorageError::CreateFile { path, source }),
        }
    }
}

impl ClaimedFile {
    fn new(file_name: String, path: PathBuf, file: File) -> Self {
        Self {
            file_name,
            path,
            file,
            written: 0,
        }
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|e| self.write_error(e))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flushes to disk and describes the stored file. A failed flush removes the file.
    pub async fn finish(mut self, dir: &ResolvedDir) -> Result<StoredFile, StorageError> {
        let flushed = async {
            self.file.flush().await?;
            self.file.sync_all().await
        }
        .await;

        if let Err(e) = flushed {
            let err = self.write_error(e);
            self.discard().await;
            return Err(err);
        }

        Ok(StoredFile {
            relative_path: dir.relative_file(&self.file_name),
            file_name: self.file_name,
            absolute_path: self.path,
            size: self.written,
        })
    }

    /// Removes a partially written file. Best effort.
    pub async fn discard(self) {
        let path = self.path.clone();
        drop(self.file);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("Failed to remove partial file {}: {}", path.display(), e);
        }
    }

    fn write_error(&self, e: std::io::Error) -> StorageError {
        StorageError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        }
    }
}

/// Streams one multipart field into `target`, returning the bytes written.
pub async fn copy_field(field: &mut Field<'_>, target: &mut ClaimedFile) -> Result<u64, CopyError> {
    let mut total = 0u64;
    while let Some(chunk) = field.chunk().await? {
        target.write_chunk(&chunk).await?;
        total += chunk.len() as u64;
    }
    Ok(total)
}

/// Extension of a client file name: the suffix starting at the final `.` of the last
/// path element, dot included. Empty when there is none.
pub fn extension_of(file_name: &str) -> &str {
    let last = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match last.rfind('.') {
        Some(idx) => &last[idx..],
        None => "",
    }
}

/// Reduces a client-declared file name to its final path element.
fn base_file_name(file_name: &str) -> Result<String, StorageError> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or("");
    if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
        return Err(StorageError::InvalidFileName(file_name.to_string()));
    }
    Ok(base.to_string())
}

async fn ensure_dir(dir: &Path) -> Result<(), StorageError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| StorageError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
}

async fn create_new(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path).await
}
