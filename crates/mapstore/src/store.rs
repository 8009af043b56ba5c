// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Coordinator facade: registration, deregistration, and lease issuance.
//!
//! [`MapStore`] combines the region registry and the payload cache under a
//! single mutex and implements the per-file status machine:
//!
//! ```text
//!                  register (new)
//!                       |
//!                       v
//!            +------ Registered -------+
//!            |           |             |
//!  register (equal   deregister     deregister
//!  version, self-    (leases == 0)  (leases > 0)
//!  loop)                 |             |
//!                        v             v
//!                  Deregistered   MarkedForDeregister
//!                                      |
//!                                release -> leases == 0
//!                                      |
//!                                      v
//!                                 Deregistered
//! ```
//!
//! # Thread Safety
//!
//! All mutation of the registry, the cache, and descriptor status/lease
//! counts happens under one `parking_lot::Mutex`; operations are
//! linearizable. The backend's payload factory and deregistration hook run
//! while that mutex is held, so backends must not call back into the store.
//!
//! # Teardown
//!
//! Call [`MapStore::cleanup`] before dropping the store; dropping with a
//! non-empty payload cache is a contract violation.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::MapBackend;
use crate::cache::PayloadCache;
use crate::descriptor::{MapDescriptor, MapKind, MapStatus};
use crate::error::Result;
use crate::ident::MapId;
use crate::lease::MapLease;
use crate::local_file::LocalMapFile;
use crate::registry::RegionRegistry;

/// Cache capacity used by [`MapStore::new`].
pub const DEFAULT_CACHE_CAPACITY: usize = 5;

struct StoreInner<P> {
    registry: RegionRegistry,
    cache: PayloadCache<P>,
}

/// Registry and lease-lifecycle manager for versioned map files.
///
/// Thread-safe; share it by reference across threads. Leases borrow the
/// store, so every lease must be dropped before the store itself.
pub struct MapStore<B: MapBackend> {
    backend: B,
    inner: Mutex<StoreInner<B::Payload>>,
}

impl<B: MapBackend> MapStore<B> {
    /// Create a store with [`DEFAULT_CACHE_CAPACITY`].
    pub fn new(backend: B) -> Self {
        Self::with_cache_capacity(backend, DEFAULT_CACHE_CAPACITY)
    }

    /// Create a store with an explicit payload-cache capacity.
    ///
    /// `capacity` must be greater than zero and is fixed for the lifetime
    /// of the store.
    pub fn with_cache_capacity(backend: B, capacity: usize) -> Self {
        log::debug!("[MapStore] created with cache capacity {}", capacity);
        Self {
            backend,
            inner: Mutex::new(StoreInner {
                registry: RegionRegistry::new(),
                cache: PayloadCache::new(capacity),
            }),
        }
    }

    /// The backend supplied at construction.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Register a map file, or refresh the registration for its region.
    ///
    /// The returned flag is `true` iff a new descriptor was created:
    ///
    /// - unknown region: the file is probed and registered;
    /// - newer than the current descriptor: the current one is
    ///   deregistered (deferred if leased) and the file registered;
    /// - same version as the current descriptor: idempotent re-registration;
    ///   the existing descriptor is forced back to `Registered` and a lease
    ///   to it is returned with `false`;
    /// - older than the current descriptor: rejected with an inactive lease
    ///   and `false`.
    ///
    /// A file that fails the version probe or carries an unclassifiable
    /// scale range is rejected the same way, with nothing mutated.
    ///
    /// # Errors
    ///
    /// Returns `Err` only when the backend's payload factory fails while
    /// the embedded lease is acquired.
    pub fn register(&self, file: LocalMapFile) -> Result<(MapLease<'_, B>, bool)> {
        let mut inner = self.inner.lock();

        let current = inner.registry.current(&file.region);
        let info = match current.alive_info() {
            Some(info) => Arc::clone(info),
            None => return self.register_impl(&mut inner, file),
        };

        // Deregister the old map for the region.
        if info.version() < file.version {
            self.deregister_id_impl(&mut inner, &current);
            return self.register_impl(&mut inner, file);
        }

        // Refresh the status of the map with the same version.
        if info.version() == file.version {
            log::warn!(
                "[MapStore] re-registering already known map `{}` (version {})",
                file.region,
                file.version
            );
            info.set_status(MapStatus::Registered);
            let payload = self.acquire_impl(&mut inner, &current)?;
            return Ok((MapLease::new(self, current, payload), false));
        }

        log::warn!(
            "[MapStore] rejecting map `{}`: incoming version {} is older than registered {}",
            file.region,
            file.version,
            info.version()
        );
        Ok((MapLease::null(), false))
    }

    /// Deregister the current descriptor for `region`.
    ///
    /// Returns `true` if deregistration completed immediately, `false` if
    /// it was deferred behind outstanding leases or the region is unknown.
    pub fn deregister(&self, region: &str) -> bool {
        let mut inner = self.inner.lock();

        let id = inner.registry.current(region);
        if !id.is_alive() {
            return false;
        }
        let deregistered = self.deregister_id_impl(&mut inner, &id);
        inner.cache.purge(&id);
        deregistered
    }

    /// Deregister every descriptor, current and superseded, then drop all
    /// cached payloads.
    ///
    /// Descriptors with outstanding leases are marked and complete their
    /// deregistration when the last lease is released.
    pub fn deregister_all(&self) {
        let mut inner = self.inner.lock();

        // Histories shrink while we deregister, so walk a snapshot.
        let snapshot = inner.registry.snapshot();
        for info in snapshot {
            self.deregister_id_impl(&mut inner, &MapId::new(info));
        }
        inner.cache.clear();
    }

    /// True iff `region` has a current descriptor with status `Registered`.
    pub fn is_loaded(&self, region: &str) -> bool {
        let inner = self.inner.lock();
        inner
            .registry
            .current(region)
            .info()
            .is_some_and(|info| info.is_up_to_date())
    }

    /// The current descriptor of every known region. Order unspecified.
    pub fn descriptors(&self) -> Vec<Arc<MapDescriptor>> {
        let inner = self.inner.lock();
        inner.registry.current_all()
    }

    /// Resolve `region` to the id of its current descriptor.
    ///
    /// Unknown regions resolve to the null id; no error is signalled.
    pub fn id_by_region(&self, region: &str) -> MapId {
        let inner = self.inner.lock();
        inner.registry.current(region)
    }

    /// Acquire a lease on the payload for `id`.
    ///
    /// A descriptor that is no longer up-to-date yields an inactive lease.
    ///
    /// # Errors
    ///
    /// Propagates a payload-factory failure; the store is left unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not alive. Use [`MapStore::lease_by_region`] when
    /// existence has not been established.
    pub fn lease(&self, id: &MapId) -> Result<MapLease<'_, B>> {
        let mut inner = self.inner.lock();
        let payload = self.acquire_impl(&mut inner, id)?;
        Ok(MapLease::new(self, id.clone(), payload))
    }

    /// Resolve `region` and acquire a lease on its current payload.
    ///
    /// Unknown regions and descriptors that are not up-to-date yield an
    /// inactive lease; no error is signalled for either.
    ///
    /// # Errors
    ///
    /// Propagates a payload-factory failure.
    pub fn lease_by_region(&self, region: &str) -> Result<MapLease<'_, B>> {
        let mut inner = self.inner.lock();

        let id = inner.registry.current(region);
        if !id.is_alive() {
            return Ok(MapLease::null());
        }
        let payload = self.acquire_impl(&mut inner, &id)?;
        Ok(MapLease::new(self, id, payload))
    }

    /// Drop every cached payload. Descriptors and lease counts are
    /// untouched; the next acquisition per id goes through the factory.
    pub fn clear_cache(&self) {
        let mut inner = self.inner.lock();
        inner.cache.clear();
    }

    /// Drain the payload cache ahead of teardown.
    ///
    /// Must be called before the store is dropped; `Drop` asserts the cache
    /// is empty.
    pub fn cleanup(&self) {
        self.clear_cache();
    }

    /// Number of idle payloads currently cached.
    pub fn cache_len(&self) -> usize {
        let inner = self.inner.lock();
        inner.cache.len()
    }

    /// Number of regions with at least one registered descriptor.
    pub fn region_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.registry.region_count()
    }

    fn register_impl<'s>(
        &'s self,
        inner: &mut StoreInner<B::Payload>,
        file: LocalMapFile,
    ) -> Result<(MapLease<'s, B>, bool)> {
        let Some(meta) = self.backend.probe_version(&file) else {
            log::warn!("[MapStore] version probe failed for {}", file);
            return Ok((MapLease::null(), false));
        };
        let Some(kind) = MapKind::from_scales(meta.min_scale, meta.max_scale) else {
            log::warn!(
                "[MapStore] unclassifiable scale range ({}, {}) for {}",
                meta.min_scale,
                meta.max_scale,
                file
            );
            return Ok((MapLease::null(), false));
        };

        let info = Arc::new(MapDescriptor::new(file, meta, kind));
        inner.registry.push(Arc::clone(&info));
        let id = MapId::new(info);

        let payload = self.acquire_impl(inner, &id)?;
        Ok((MapLease::new(self, id, payload), true))
    }

    /// Terminal or deferred deregistration of one descriptor.
    ///
    /// Returns `true` iff the descriptor reached `Deregistered` here.
    fn deregister_id_impl(&self, inner: &mut StoreInner<B::Payload>, id: &MapId) -> bool {
        let Some(info) = id.alive_info() else {
            return false;
        };

        if info.lease_count() == 0 {
            info.set_status(MapStatus::Deregistered);
            inner.registry.remove(info);
            // No cached payload may outlive its descriptor's registration.
            inner.cache.purge(id);
            log::debug!("[MapStore] deregistered {}", info.file());
            self.backend.on_deregistered(info.file());
            return true;
        }

        info.set_status(MapStatus::MarkedForDeregister);
        log::debug!(
            "[MapStore] deferred deregistration of {} ({} leases outstanding)",
            info.file(),
            info.lease_count()
        );
        false
    }

    /// Bump the lease count and produce a payload for `id`, from the cache
    /// if one is parked there, otherwise through the factory.
    fn acquire_impl(
        &self,
        inner: &mut StoreInner<B::Payload>,
        id: &MapId,
    ) -> Result<Option<B::Payload>> {
        #[allow(clippy::expect_used)] // leasing a dead id is a caller contract violation
        let info = id.alive_info().expect("cannot lease a dead map id");
        if !info.is_up_to_date() {
            return Ok(None);
        }

        info.inc_lease();

        if let Some(payload) = inner.cache.take(id) {
            return Ok(Some(payload));
        }

        // A failed factory call must leave the descriptor untouched, so the
        // count bump above is rolled back before the error escapes.
        match self.backend.open_payload(info.file()) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) => {
                info.dec_lease();
                Err(err)
            }
        }
    }

    /// Return a payload at the end of its lease. Called from `MapLease`'s
    /// `Drop`, never with the store mutex held.
    pub(crate) fn release(&self, id: &MapId, payload: B::Payload) {
        let mut inner = self.inner.lock();

        debug_assert!(id.is_alive(), "releasing a payload for a dead id: {:?}", id);
        let Some(info) = id.alive_info() else {
            return; // payload dropped
        };

        info.dec_lease();

        if info.lease_count() == 0 && info.status() == MapStatus::MarkedForDeregister {
            let deregistered = self.deregister_id_impl(&mut inner, id);
            debug_assert!(
                deregistered,
                "deferred deregistration must complete on the last release"
            );
            return; // payload destroyed, never cached
        }

        if info.lease_count() == 0 && info.is_up_to_date() {
            inner.cache.insert(id.clone(), payload);
        }
        // Still leased elsewhere or not up-to-date: the payload is dropped
        // here; the cache only parks idle payloads, one slot per id.
    }
}

impl<B: MapBackend> Drop for MapStore<B> {
    fn drop(&mut self) {
        // Teardown contract: cleanup() drains the cache first.
        debug_assert!(
            self.inner.get_mut().cache.is_empty(),
            "MapStore dropped with a non-empty payload cache; call cleanup() first"
        );
    }
}

#[cfg(test)]
mod tests;
