// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Stable identity handle for a registered map file.
//!
//! A [`MapId`] refers to a [`MapDescriptor`] independently of whether the
//! descriptor is still registered. Equality and hashing compare descriptor
//! *identity* (the shared allocation), never content; this is what lets the
//! payload cache locate entries for descriptors that have since been
//! deregistered.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::descriptor::{MapDescriptor, MapStatus};

/// Opaque, equality-comparable handle to a descriptor. May be null.
#[derive(Clone, Default)]
pub struct MapId {
    info: Option<Arc<MapDescriptor>>,
}

impl MapId {
    pub(crate) fn new(info: Arc<MapDescriptor>) -> Self {
        Self { info: Some(info) }
    }

    /// The null id: refers to nothing, compares equal only to itself.
    pub fn null() -> Self {
        Self { info: None }
    }

    /// The descriptor this id refers to, if any.
    ///
    /// Present even after deregistration, as long as the id itself is held.
    pub fn info(&self) -> Option<&Arc<MapDescriptor>> {
        self.info.as_ref()
    }

    /// The descriptor, but only while it has not reached `Deregistered`.
    pub(crate) fn alive_info(&self) -> Option<&Arc<MapDescriptor>> {
        self.info
            .as_ref()
            .filter(|info| info.status() != MapStatus::Deregistered)
    }

    /// True iff this id refers to a descriptor that is not `Deregistered`.
    pub fn is_alive(&self) -> bool {
        self.alive_info().is_some()
    }
}

impl PartialEq for MapId {
    fn eq(&self, other: &Self) -> bool {
        match (&self.info, &other.info) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for MapId {}

impl Hash for MapId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.info {
            Some(info) => (Arc::as_ptr(info) as usize).hash(state),
            None => 0usize.hash(state),
        }
    }
}

impl std::fmt::Debug for MapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.info {
            Some(info) => write!(f, "MapId({} v{})", info.region(), info.version()),
            None => write!(f, "MapId(null)"),
        }
    }
}
