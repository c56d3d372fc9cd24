//! Error types for upload-mirror

use std::path::PathBuf;
use thiserror::Error;

/// Fatal at startup: the node refuses to serve without a valid configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Random source unavailable: {0}")]
    Entropy(#[from] rand::Error),

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),

    #[error("Failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),
}

impl StorageError {
    /// Short tag used in per-part and per-replica log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::Entropy(_) => "EntropyError",
            StorageError::CreateDir { .. } | StorageError::CreateFile { .. } => {
                "CreateDestinationFileError"
            }
            StorageError::FileExists(_) => "FileExists",
            StorageError::Write { .. } => "WriteError",
            StorageError::InvalidFileName(_) => "InvalidFileName",
        }
    }
}

#[derive(Error, Debug)]
pub enum ReplicationError {
    #[error("Failed to read local file {path}: {source}")]
    ReadLocal {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Request to peer failed: {0}")]
    Request(#[from] reqwest::Error),
}
