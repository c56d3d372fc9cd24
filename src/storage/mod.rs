//! Local Storage Module
//!
//! Everything that touches the storage root on local disk.
//!
//! ## Core Concepts
//! - **Names**: `names` draws collision-resistant file names from the OS CSPRNG.
//! - **Placement**: `paths` turns the client's encoded sub-path into a directory that is
//!   guaranteed to stay under the storage root.
//! - **Claiming**: `writer` creates the directory on demand and claims a file with an
//!   exclusive create, so a returned path is never shared with another upload.

pub mod names;
pub mod paths;
pub mod writer;

pub use paths::{ResolvedDir, resolve};
pub use writer::{ClaimedFile, CopyError, StorageWriter, StoredFile};
