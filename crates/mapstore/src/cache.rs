// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-capacity LRU cache of idle payloads.
//!
//! Holds payloads that currently have no lease, keyed by [`MapId`]. A cache
//! hit *removes* the entry (the payload moves into the lease); a release
//! re-inserts at the most-recent position, evicting the least-recent entry
//! when the capacity is reached. Each id appears at most once.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::ident::MapId;

pub(crate) struct PayloadCache<P> {
    inner: LruCache<MapId, P>,
}

impl<P> PayloadCache<P> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            #[allow(clippy::expect_used)] // caller must pass capacity > 0; API contract
            inner: LruCache::new(NonZeroUsize::new(capacity).expect("capacity > 0")),
        }
    }

    /// Remove and return the payload for `id`, if cached.
    pub(crate) fn take(&mut self, id: &MapId) -> Option<P> {
        self.inner.pop(id)
    }

    /// Park an idle payload at the most-recent position.
    ///
    /// Evicts the least-recent entry when the cache is full; the evicted
    /// payload is dropped here.
    pub(crate) fn insert(&mut self, id: MapId, payload: P) {
        let replaced = self.inner.put(id, payload);
        debug_assert!(replaced.is_none(), "an id may hold at most one cache slot");
    }

    /// Drop the cached payload for `id`, if any.
    pub(crate) fn purge(&mut self, id: &MapId) {
        self.inner.pop(id);
    }

    pub(crate) fn clear(&mut self) {
        self.inner.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
