// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scoped borrow of an opened map payload.
//!
//! A [`MapLease`] is handed out by the store and owns its payload
//! exclusively for its lifetime. Dropping an active lease hands the payload
//! back to the store, which either parks it in the LRU cache or completes a
//! deferred deregistration. Leases are moveable but not copyable; a null
//! lease carries no payload and releases nothing.

use std::sync::Arc;

use crate::backend::MapBackend;
use crate::descriptor::MapDescriptor;
use crate::ident::MapId;
use crate::store::MapStore;

/// Borrow token for an opened map payload.
pub struct MapLease<'s, B: MapBackend> {
    store: Option<&'s MapStore<B>>,
    id: MapId,
    payload: Option<B::Payload>,
}

impl<'s, B: MapBackend> MapLease<'s, B> {
    pub(crate) fn new(store: &'s MapStore<B>, id: MapId, payload: Option<B::Payload>) -> Self {
        Self {
            store: Some(store),
            id,
            payload,
        }
    }

    /// A lease that refers to nothing. Returned for unknown regions and for
    /// descriptors that are no longer up-to-date.
    pub(crate) fn null() -> Self {
        Self {
            store: None,
            id: MapId::null(),
            payload: None,
        }
    }

    /// True iff this lease holds a payload.
    pub fn is_active(&self) -> bool {
        self.payload.is_some()
    }

    /// Identity of the leased map file. Null for a null lease.
    pub fn id(&self) -> &MapId {
        &self.id
    }

    /// Descriptor of the leased map file, for inspection.
    pub fn info(&self) -> Option<&Arc<MapDescriptor>> {
        self.id.info()
    }

    /// The payload, while the lease is active.
    pub fn payload(&self) -> Option<&B::Payload> {
        self.payload.as_ref()
    }
}

impl<B: MapBackend> Drop for MapLease<'_, B> {
    fn drop(&mut self) {
        if let (Some(store), Some(payload)) = (self.store, self.payload.take()) {
            store.release(&self.id, payload);
        }
    }
}

impl<B: MapBackend> std::fmt::Debug for MapLease<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapLease")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
