//! Ingestion Service Module
//!
//! Accepts client uploads on `/upload` and stores every file part under the storage root.
//!
//! ## Workflow
//! 1. **Placement**: The optional `Path` header is resolved once into a destination
//!    directory under the storage root.
//! 2. **Claim**: Each file part gets a freshly generated, collision-free name that keeps
//!    the original extension.
//! 3. **Storage**: The part is streamed to disk without buffering the request body.
//! 4. **Replication**: Every stored file is handed to the `ReplicationDispatcher`, which
//!    pushes it to each configured peer in the background.
//!
//! A failing part is recorded as such in the response; the remaining parts are still
//! processed.

pub mod handlers;

#[cfg(test)]
mod tests;
