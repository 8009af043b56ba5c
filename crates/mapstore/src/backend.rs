// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Extension point connecting the store to the embedder's file format.
//!
//! The store never touches map-file contents itself. Reading a version
//! header and materializing the heavyweight in-memory payload are format
//! concerns, so both go through a [`MapBackend`] implementation supplied at
//! construction, along with the notification that a file has left the
//! registry for good.

use crate::error::Result;
use crate::local_file::LocalMapFile;

/// Version and scale metadata extracted from a map file's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapVersion {
    /// Map version; higher means newer.
    pub version: i64,
    /// Lowest zoom level covered by the file.
    pub min_scale: u8,
    /// Highest zoom level covered by the file.
    pub max_scale: u8,
}

/// Format-specific callbacks supplied by the embedder.
///
/// All three callbacks run **while the store mutex is held**. They must not
/// call back into the [`MapStore`](crate::store::MapStore) that invoked
/// them; re-entrancy is undefined.
pub trait MapBackend {
    /// Heavyweight in-memory representation of an opened map file
    /// (opened indices, memory maps, ...).
    type Payload;

    /// Read version and scale metadata from the file header.
    ///
    /// Returning `None` marks the file as invalid and fails registration
    /// without mutating the store.
    fn probe_version(&self, file: &LocalMapFile) -> Option<MapVersion>;

    /// Open the file and materialize its payload. Called on every cache
    /// miss during lease acquisition; may perform I/O.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the file cannot be opened; the error propagates out
    /// of the acquisition and the store stays unchanged.
    fn open_payload(&self, file: &LocalMapFile) -> Result<Self::Payload>;

    /// Notification fired exactly once when a file's deregistration becomes
    /// terminal.
    fn on_deregistered(&self, file: &LocalMapFile) {
        let _ = file;
    }
}
