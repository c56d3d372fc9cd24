//! Upload Mirror Node Library
//!
//! This library crate defines the modules that make up one node of an upload mirror.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! - **`config`**: Immutable node settings (listen address, storage root, name length, peers),
//!   loaded once at startup and shared by reference.
//! - **`storage`**: Local disk layer. Generates collision-free names, confines client-chosen
//!   sub-paths to the storage root and claims destination files.
//! - **`ingestion`**: The `/upload` endpoint. Streams every file part of a multipart request
//!   to disk and reports where each one landed.
//! - **`replication`**: Best-effort mirroring. Pushes each stored file to every peer in a
//!   detached task and receives the files peers push on `/rsync`.
//! - **`protocol`** / **`server`**: Wire constants, response bodies and router assembly.

pub mod config;
pub mod error;
pub mod ingestion;
pub mod protocol;
pub mod replication;
pub mod server;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
