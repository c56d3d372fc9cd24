//! Sub-path resolution.
//!
//! Clients pick a logical directory under the storage root by sending it base64-encoded
//! in the `Path` header. The decoded value is never trusted: dot runs are stripped and
//! separator runs collapsed before it is joined under the root, so no input can climb
//! out of the root.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

static DOT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.{2,}").expect("valid regex"));
static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/{2,}").expect("valid regex"));

/// Destination directory computed for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDir {
    /// Absolute directory, ending in exactly one `/`.
    pub absolute: String,
    /// The same directory relative to the storage root, starting and ending with `/`.
    pub relative: String,
    /// Normalized sub-path, forwarded unchanged to peers. Empty when absent.
    pub sub_path: String,
}

impl ResolvedDir {
    pub fn dir(&self) -> PathBuf {
        PathBuf::from(&self.absolute)
    }

    /// Path reported back to the uploader for a file stored in this directory.
    pub fn relative_file(&self, file_name: &str) -> String {
        format!("{}{}", self.relative, file_name)
    }
}

/// Resolves the `Path` header value against `root`.
///
/// `root` is expected to be normalized (absolute, single trailing `/`), as
/// `StorageConfig` guarantees. An empty header, undecodable base64 or a non UTF-8
/// payload all resolve to the root itself.
pub fn resolve(root: &str, encoded_sub_path: &str) -> ResolvedDir {
    let sub_path = decode_sub_path(encoded_sub_path)
        .map(|decoded| normalize(&decoded))
        .unwrap_or_default();

    let root = ensure_trailing_separator(&collapse_separators(root));
    let absolute = if sub_path.is_empty() {
        root.clone()
    } else {
        ensure_trailing_separator(&collapse_separators(&format!("{}/{}", root, sub_path)))
    };

    // `absolute` always starts with `root`: collapsing only merges separators, and
    // `root` ends in exactly one.
    let relative = format!("/{}", &absolute[root.len()..]);

    ResolvedDir {
        absolute,
        relative,
        sub_path,
    }
}

/// Strips dot runs, then collapses separator runs. Stable under re-application.
pub fn normalize(sub_path: &str) -> String {
    collapse_separators(&DOT_RUN.replace_all(sub_path, ""))
}

pub fn collapse_separators(path: &str) -> String {
    SEPARATOR_RUN.replace_all(path, "/").into_owned()
}

/// Base64 form of a normalized sub-path, as sent in the `Path` header.
pub fn encode_sub_path(sub_path: &str) -> String {
    STANDARD.encode(sub_path.as_bytes())
}

fn decode_sub_path(encoded: &str) -> Option<String> {
    if encoded.is_empty() {
        return None;
    }
    match STANDARD.decode(encoded.trim()) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(decoded) => Some(decoded),
            Err(_) => {
                tracing::debug!("Ignoring non UTF-8 sub-path header");
                None
            }
        },
        Err(e) => {
            tracing::debug!("Ignoring undecodable sub-path header: {}", e);
            None
        }
    }
}

fn ensure_trailing_separator(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}
