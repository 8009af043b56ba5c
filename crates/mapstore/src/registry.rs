// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Region name -> ordered descriptor history.
//!
//! Each region maps to its descriptors oldest-first; the last entry is the
//! *current* one. Older entries linger only while deferred deregistration
//! keeps them alive for outstanding leases. Only the store mutates this,
//! under its mutex.

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::MapDescriptor;
use crate::ident::MapId;

pub(crate) struct RegionRegistry {
    regions: HashMap<String, Vec<Arc<MapDescriptor>>>,
}

impl RegionRegistry {
    pub(crate) fn new() -> Self {
        Self {
            regions: HashMap::new(),
        }
    }

    /// Id of the current (newest) descriptor for `region`, or the null id.
    ///
    /// A history drained mid-operation counts as absent.
    pub(crate) fn current(&self, region: &str) -> MapId {
        debug_assert!(!region.is_empty(), "region name must be non-empty");
        match self.regions.get(region).and_then(|infos| infos.last()) {
            Some(info) => MapId::new(Arc::clone(info)),
            None => MapId::null(),
        }
    }

    /// Append a descriptor as the new current entry for its region.
    pub(crate) fn push(&mut self, info: Arc<MapDescriptor>) {
        self.regions
            .entry(info.region().to_string())
            .or_default()
            .push(info);
    }

    /// Remove one descriptor from its region's history.
    ///
    /// Drained histories drop their key so lookups see the region as absent.
    pub(crate) fn remove(&mut self, info: &Arc<MapDescriptor>) {
        if let Some(infos) = self.regions.get_mut(info.region()) {
            infos.retain(|entry| !Arc::ptr_eq(entry, info));
            if infos.is_empty() {
                self.regions.remove(info.region());
            }
        }
    }

    /// Every descriptor across all histories, for iteration that mutates
    /// the registry as it goes.
    pub(crate) fn snapshot(&self) -> Vec<Arc<MapDescriptor>> {
        self.regions
            .values()
            .flat_map(|infos| infos.iter().cloned())
            .collect()
    }

    /// The current descriptor of every non-empty history. Order unspecified.
    pub(crate) fn current_all(&self) -> Vec<Arc<MapDescriptor>> {
        self.regions
            .values()
            .filter_map(|infos| infos.last().cloned())
            .collect()
    }

    /// Number of regions with a non-empty history.
    pub(crate) fn region_count(&self) -> usize {
        self.regions.values().filter(|infos| !infos.is_empty()).count()
    }
}
