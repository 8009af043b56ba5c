// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # mapstore - Registry for versioned on-disk map files
//!
//! A registry and lease-lifecycle manager for versioned map data files.
//! `mapstore` mediates between code that wants to query map data and the set
//! of map files currently known on local storage. It catalogues files by
//! region name with their version and registration status, and hands out
//! **leases** on opened payloads backed by a bounded LRU cache.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mapstore::{LocalMapFile, MapBackend, MapStore, MapVersion, Result};
//!
//! struct FileBackend;
//!
//! impl MapBackend for FileBackend {
//!     type Payload = Vec<u8>;
//!
//!     fn probe_version(&self, file: &LocalMapFile) -> Option<MapVersion> {
//!         // A real backend reads the file header here.
//!         Some(MapVersion { version: file.version, min_scale: 1, max_scale: 15 })
//!     }
//!
//!     fn open_payload(&self, file: &LocalMapFile) -> Result<Vec<u8>> {
//!         Ok(std::fs::read(&file.path)?)
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let store = MapStore::new(FileBackend);
//!
//!     let (lease, newly_registered) =
//!         store.register(LocalMapFile::new("germany", 260101, "maps/germany.map"))?;
//!     assert!(newly_registered && lease.is_active());
//!
//!     // Dropping the lease parks the payload in the LRU cache.
//!     drop(lease);
//!
//!     // Re-acquire without touching the disk again.
//!     let lease = store.lease_by_region("germany")?;
//!     assert!(lease.is_active());
//!
//!     drop(lease);
//!     store.cleanup();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                        MapStore<B>                           |
//! |  one mutex over { RegionRegistry, PayloadCache }             |
//! +--------------------------------------------------------------+
//! |  RegionRegistry          |  PayloadCache<B::Payload>         |
//! |  region -> [descriptor]  |  LRU of idle payloads by MapId    |
//! +--------------------------------------------------------------+
//! |  MapBackend (extension point)                                |
//! |  probe_version | open_payload | on_deregistered              |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`MapStore`] | Entry point: register, deregister, and lease map files |
//! | [`MapBackend`] | Trait the embedder implements to probe and open files |
//! | [`MapLease`] | Scoped borrow of an opened payload, released on drop |
//! | [`MapId`] | Stable identity handle for a registered map file |
//! | [`MapDescriptor`] | Per-file metadata (region, version, scales, status) |
//! | [`LocalMapFile`] | Caller-supplied `{region, version, path}` record |
//!
//! ## Lifecycle
//!
//! A registered descriptor moves `Registered -> MarkedForDeregister ->
//! Deregistered`. Deregistration is deferred while leases are outstanding
//! and completes when the last lease is released; a payload in active use is
//! never destroyed or replaced.

/// Extension-point trait and probe result (`MapBackend`, `MapVersion`).
pub mod backend;
/// Per-file metadata record, status and classification.
pub mod descriptor;
/// Crate error type and result alias.
pub mod error;
/// Stable identity handles for descriptors.
pub mod ident;
/// Scoped payload borrows.
pub mod lease;
/// Caller-supplied local file records.
pub mod local_file;
/// Scale-range constants for map classification.
pub mod scales;
/// The coordinator facade.
pub mod store;

mod cache;
mod registry;

pub use backend::{MapBackend, MapVersion};
pub use descriptor::{MapDescriptor, MapKind, MapStatus};
pub use error::{Error, Result};
pub use ident::MapId;
pub use lease::MapLease;
pub use local_file::LocalMapFile;
pub use store::{MapStore, DEFAULT_CACHE_CAPACITY};

/// mapstore version string.
pub const VERSION: &str = "0.2.0";
