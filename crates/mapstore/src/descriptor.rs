// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-file metadata record.
//!
//! A [`MapDescriptor`] is created when a map file is registered and carries
//! its identity (region name), probed version, scale range, and two pieces
//! of mutable runtime state: the registration [`MapStatus`] and the number
//! of outstanding leases. Both mutable fields are written only while the
//! store mutex is held; they live in atomics purely so the shared
//! `Arc<MapDescriptor>` handle stays `Sync`.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::backend::MapVersion;
use crate::local_file::LocalMapFile;
use crate::scales::{UPPER_SCALE, UPPER_WORLD_SCALE};

/// Registration status of a map file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MapStatus {
    /// Registered and available for leasing.
    Registered = 0,
    /// Deregistration requested while leases were outstanding; completes
    /// when the last lease is released.
    MarkedForDeregister = 1,
    /// Terminal: removed from the registry. The descriptor object survives
    /// while ids or leases still reference it.
    Deregistered = 2,
}

impl MapStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => MapStatus::Registered,
            1 => MapStatus::MarkedForDeregister,
            _ => MapStatus::Deregistered,
        }
    }
}

/// Dataset family, derived from the scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    /// Country or region dataset (`min_scale > 0`).
    Country,
    /// World overview dataset (`max_scale == UPPER_WORLD_SCALE`).
    World,
    /// Coastline dataset (`max_scale == UPPER_SCALE`).
    Coast,
}

impl MapKind {
    /// Classify a scale range, or `None` if the range fits no family.
    ///
    /// A `None` here fails registration; descriptors never carry an
    /// unclassifiable range.
    pub fn from_scales(min_scale: u8, max_scale: u8) -> Option<MapKind> {
        if min_scale > 0 {
            return Some(MapKind::Country);
        }
        if max_scale == UPPER_WORLD_SCALE {
            return Some(MapKind::World);
        }
        if max_scale == UPPER_SCALE {
            return Some(MapKind::Coast);
        }
        None
    }
}

/// In-memory metadata record for one registered map file.
pub struct MapDescriptor {
    file: LocalMapFile,
    version: i64,
    min_scale: u8,
    max_scale: u8,
    kind: MapKind,
    // Written only under the store mutex; Relaxed is sufficient.
    status: AtomicU8,
    lease_count: AtomicU32,
}

impl MapDescriptor {
    pub(crate) fn new(file: LocalMapFile, meta: MapVersion, kind: MapKind) -> Self {
        Self {
            file,
            version: meta.version,
            min_scale: meta.min_scale,
            max_scale: meta.max_scale,
            kind,
            status: AtomicU8::new(MapStatus::Registered as u8),
            lease_count: AtomicU32::new(0),
        }
    }

    /// Region name this descriptor belongs to.
    pub fn region(&self) -> &str {
        &self.file.region
    }

    /// The local file this descriptor was registered from.
    pub fn file(&self) -> &LocalMapFile {
        &self.file
    }

    /// Probed map version; higher means newer.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Probed `[min_scale, max_scale]` zoom range.
    pub fn scale_range(&self) -> (u8, u8) {
        (self.min_scale, self.max_scale)
    }

    /// Dataset family derived from the scale range at registration.
    pub fn kind(&self) -> MapKind {
        self.kind
    }

    /// Current registration status.
    pub fn status(&self) -> MapStatus {
        MapStatus::from_u8(self.status.load(Ordering::Relaxed))
    }

    /// True iff the descriptor is `Registered`. Payloads are only
    /// materialized for up-to-date descriptors.
    pub fn is_up_to_date(&self) -> bool {
        self.status() == MapStatus::Registered
    }

    /// Number of outstanding leases on this descriptor.
    pub fn lease_count(&self) -> u32 {
        self.lease_count.load(Ordering::Relaxed)
    }

    pub(crate) fn set_status(&self, status: MapStatus) {
        self.status.store(status as u8, Ordering::Relaxed);
    }

    pub(crate) fn inc_lease(&self) {
        self.lease_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dec_lease(&self) {
        let prev = self.lease_count.fetch_sub(1, Ordering::Relaxed);
        assert!(prev > 0, "lease count underflow for `{}`", self.region());
    }
}

impl std::fmt::Debug for MapDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapDescriptor")
            .field("region", &self.region())
            .field("version", &self.version)
            .field("scales", &(self.min_scale, self.max_scale))
            .field("kind", &self.kind)
            .field("status", &self.status())
            .field("lease_count", &self.lease_count())
            .finish()
    }
}
