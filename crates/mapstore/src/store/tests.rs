// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//! End-to-end tests for MapStore.

use super::*;
use crate::backend::MapVersion;
use crate::error::Error;
use crate::scales::UPPER_SCALE;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Stand-in for the heavyweight payload a real backend would materialize.
struct TestPayload {
    region: String,
    serial: usize,
}

/// Backend fixture: probes succeed with the caller-advertised version and a
/// configurable scale range, payloads are counted as they are opened, and
/// deregistration hooks are recorded in order.
struct FakeBackend {
    scales: (u8, u8),
    fail_probe: AtomicBool,
    fail_open: AtomicBool,
    opened: AtomicUsize,
    deregistered: Mutex<Vec<(String, i64)>>,
}

impl FakeBackend {
    fn new() -> Self {
        Self::with_scales(0, UPPER_SCALE)
    }

    fn with_scales(min_scale: u8, max_scale: u8) -> Self {
        Self {
            scales: (min_scale, max_scale),
            fail_probe: AtomicBool::new(false),
            fail_open: AtomicBool::new(false),
            opened: AtomicUsize::new(0),
            deregistered: Mutex::new(Vec::new()),
        }
    }

    fn set_fail_probe(&self, fail: bool) {
        self.fail_probe.store(fail, Ordering::SeqCst);
    }

    fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// How many times the payload factory ran.
    fn opened_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// `(region, version)` per deregistration hook, in firing order.
    fn deregistered(&self) -> Vec<(String, i64)> {
        self.deregistered.lock().clone()
    }
}

impl MapBackend for FakeBackend {
    type Payload = Arc<TestPayload>;

    fn probe_version(&self, file: &LocalMapFile) -> Option<MapVersion> {
        if self.fail_probe.load(Ordering::SeqCst) {
            return None;
        }
        Some(MapVersion {
            version: file.version,
            min_scale: self.scales.0,
            max_scale: self.scales.1,
        })
    }

    fn open_payload(&self, file: &LocalMapFile) -> crate::error::Result<Self::Payload> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(Error::PayloadOpen {
                region: file.region.clone(),
                reason: "forced failure".to_string(),
            });
        }
        let serial = self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(TestPayload {
            region: file.region.clone(),
            serial,
        }))
    }

    fn on_deregistered(&self, file: &LocalMapFile) {
        self.deregistered
            .lock()
            .push((file.region.clone(), file.version));
    }
}

fn file(region: &str, version: i64) -> LocalMapFile {
    LocalMapFile::new(region, version, format!("{region}.map"))
}

fn store() -> MapStore<FakeBackend> {
    MapStore::new(FakeBackend::new())
}

#[test]
fn test_register_basic() {
    let store = store();

    let (lease, newly_registered) = store.register(file("de", 10)).unwrap();
    assert!(newly_registered);
    assert!(lease.is_active());
    assert_eq!(lease.payload().unwrap().region, "de");

    let infos = store.descriptors();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].region(), "de");
    assert_eq!(infos[0].version(), 10);
    assert_eq!(infos[0].kind(), MapKind::Coast);
    assert_eq!(infos[0].scale_range(), (0, UPPER_SCALE));
    assert_eq!(infos[0].lease_count(), 1);
    assert!(store.is_loaded("de"));

    drop(lease);
    assert_eq!(store.cache_len(), 1);
    assert_eq!(infos[0].lease_count(), 0);

    store.cleanup();
}

#[test]
fn test_register_idempotent() {
    let store = store();

    let (lease1, first) = store.register(file("de", 10)).unwrap();
    let id = lease1.id().clone();
    drop(lease1);

    let (lease2, second) = store.register(file("de", 10)).unwrap();
    assert!(first);
    assert!(!second);
    assert!(lease2.is_active());
    assert_eq!(*lease2.id(), id);
    assert_eq!(store.descriptors().len(), 1);

    drop(lease2);
    store.cleanup();
}

#[test]
fn test_upgrade_with_active_lease() {
    let store = store();

    let (lease_a, _) = store.register(file("de", 10)).unwrap();
    let (lease_b, newly_registered) = store.register(file("de", 11)).unwrap();
    assert!(newly_registered);
    assert_ne!(lease_a.id(), lease_b.id());

    // The old descriptor is only marked: a lease is still out on it.
    let old_info = lease_a.info().unwrap();
    assert_eq!(old_info.status(), MapStatus::MarkedForDeregister);
    assert!(store.backend().deregistered().is_empty());
    assert!(store.is_loaded("de"));

    // The held lease keeps the old payload fully usable.
    assert_eq!(lease_a.payload().unwrap().region, "de");

    // Last release completes the deferred deregistration.
    drop(lease_a);
    assert_eq!(store.backend().deregistered(), vec![("de".to_string(), 10)]);
    assert_eq!(store.cache_len(), 0); // the old payload was destroyed, not cached

    drop(lease_b);
    assert_eq!(store.cache_len(), 1);

    let infos = store.descriptors();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].version(), 11);

    store.cleanup();
}

#[test]
fn test_stale_version_rejected() {
    let store = store();

    let (lease, _) = store.register(file("de", 11)).unwrap();
    drop(lease);
    let opened = store.backend().opened_count();

    let (stale, newly_registered) = store.register(file("de", 10)).unwrap();
    assert!(!newly_registered);
    assert!(!stale.is_active());
    assert!(stale.info().is_none());

    // Nothing mutated, nothing opened.
    assert_eq!(store.descriptors()[0].version(), 11);
    assert_eq!(store.backend().opened_count(), opened);

    store.cleanup();
}

#[test]
fn test_lru_eviction() {
    let store = MapStore::with_cache_capacity(FakeBackend::new(), 2);

    for region in ["a", "b", "c"] {
        let (lease, _) = store.register(file(region, 1)).unwrap();
        drop(lease);
    }
    assert_eq!(store.cache_len(), 2); // "a" was evicted
    assert_eq!(store.backend().opened_count(), 3);

    // "b" and "c" are still parked; "a" goes through the factory again.
    let lease = store.lease_by_region("b").unwrap();
    assert!(lease.is_active());
    drop(lease);
    assert_eq!(store.backend().opened_count(), 3);

    let lease = store.lease_by_region("a").unwrap();
    assert!(lease.is_active());
    drop(lease);
    assert_eq!(store.backend().opened_count(), 4);

    store.cleanup();
}

#[test]
fn test_deregister_all_with_multi_version_history() {
    let store = store();

    let (lease_v5, _) = store.register(file("r", 5)).unwrap();
    let (lease_v6, _) = store.register(file("r", 6)).unwrap();
    drop(lease_v6); // v6 payload parked in the cache; v5 marked by the upgrade
    assert_eq!(store.cache_len(), 1);

    store.deregister_all();

    // v6 went immediately; v5 stays marked behind the outstanding lease.
    assert_eq!(store.backend().deregistered(), vec![("r".to_string(), 6)]);
    assert_eq!(store.cache_len(), 0);
    assert!(!store.is_loaded("r"));
    assert_eq!(store.region_count(), 1);

    drop(lease_v5);
    assert_eq!(
        store.backend().deregistered(),
        vec![("r".to_string(), 6), ("r".to_string(), 5)]
    );
    assert_eq!(store.region_count(), 0);

    store.cleanup();
}

#[test]
fn test_deregister_immediate() {
    let store = store();

    let (lease, _) = store.register(file("de", 10)).unwrap();
    drop(lease);
    assert_eq!(store.cache_len(), 1);

    assert!(store.deregister("de"));
    assert_eq!(store.backend().deregistered(), vec![("de".to_string(), 10)]);
    assert_eq!(store.cache_len(), 0); // cached payload purged with the descriptor
    assert!(!store.is_loaded("de"));
    assert_eq!(store.region_count(), 0);

    store.cleanup();
}

#[test]
fn test_deregister_deferred() {
    let store = store();

    let (lease, _) = store.register(file("de", 10)).unwrap();

    assert!(!store.deregister("de"));
    assert!(store.backend().deregistered().is_empty());
    assert!(!store.is_loaded("de"));
    assert_eq!(
        lease.info().unwrap().status(),
        MapStatus::MarkedForDeregister
    );

    // The lease keeps working until it is dropped.
    assert!(lease.is_active());
    drop(lease);

    assert_eq!(store.backend().deregistered(), vec![("de".to_string(), 10)]);
    assert_eq!(store.region_count(), 0);
    assert_eq!(store.cache_len(), 0);

    store.cleanup();
}

#[test]
fn test_deregister_unknown_region() {
    let store = store();
    assert!(!store.deregister("nowhere"));
    store.cleanup();
}

#[test]
fn test_id_by_region() {
    let store = store();

    assert!(!store.id_by_region("de").is_alive());

    let (lease, _) = store.register(file("de", 10)).unwrap();
    let id = store.id_by_region("de");
    assert!(id.is_alive());
    assert_eq!(&id, lease.id());

    drop(lease);
    store.cleanup();
}

#[test]
fn test_lease_not_up_to_date() {
    let store = store();

    let (held, _) = store.register(file("de", 10)).unwrap();
    store.deregister("de"); // deferred: descriptor marked
    let id = store.id_by_region("de");

    let lease = store.lease(&id).unwrap();
    assert!(!lease.is_active());
    let lease = store.lease_by_region("de").unwrap();
    assert!(!lease.is_active());

    // Inactive acquisitions never bump the lease count.
    assert_eq!(held.info().unwrap().lease_count(), 1);

    drop(held);
    store.cleanup();
}

#[test]
fn test_lease_by_region_unknown() {
    let store = store();

    let lease = store.lease_by_region("nowhere").unwrap();
    assert!(!lease.is_active());
    assert!(lease.id().info().is_none());
    assert!(lease.payload().is_none());

    drop(lease);
    store.cleanup();
}

#[test]
fn test_cache_round_trip_returns_same_payload() {
    let store = store();

    let (lease, _) = store.register(file("de", 10)).unwrap();
    let first = Arc::clone(lease.payload().unwrap());
    drop(lease);

    let lease = store.lease_by_region("de").unwrap();
    assert!(Arc::ptr_eq(&first, lease.payload().unwrap()));
    assert_eq!(store.backend().opened_count(), 1);

    drop(lease);
    store.cleanup();
}

#[test]
fn test_clear_cache_forces_reopen() {
    let store = store();

    let (lease, _) = store.register(file("de", 10)).unwrap();
    let first_serial = lease.payload().unwrap().serial;
    drop(lease);

    store.clear_cache();
    assert_eq!(store.cache_len(), 0);
    assert!(store.is_loaded("de")); // descriptors are untouched

    let lease = store.lease_by_region("de").unwrap();
    assert_ne!(lease.payload().unwrap().serial, first_serial);
    assert_eq!(store.backend().opened_count(), 2);

    drop(lease);
    store.cleanup();
}

#[test]
fn test_probe_failure_mutates_nothing() {
    let store = store();
    store.backend().set_fail_probe(true);

    let (lease, newly_registered) = store.register(file("de", 10)).unwrap();
    assert!(!newly_registered);
    assert!(!lease.is_active());
    assert_eq!(store.region_count(), 0);
    assert_eq!(store.backend().opened_count(), 0);

    store.cleanup();
}

#[test]
fn test_unclassifiable_scale_range_rejected() {
    let store = MapStore::new(FakeBackend::with_scales(0, 12));

    let (lease, newly_registered) = store.register(file("de", 10)).unwrap();
    assert!(!newly_registered);
    assert!(!lease.is_active());
    assert_eq!(store.region_count(), 0);

    store.cleanup();
}

#[test]
fn test_factory_failure_rolls_back_lease_count() {
    let store = store();
    store.backend().set_fail_open(true);

    // Registration probes fine but the embedded acquisition fails; the
    // descriptor stays registered with no leases.
    let err = store.register(file("de", 10)).unwrap_err();
    assert!(matches!(err, Error::PayloadOpen { .. }));
    assert!(store.is_loaded("de"));
    let info = store.id_by_region("de").info().unwrap().clone();
    assert_eq!(info.lease_count(), 0);

    // A plain acquisition fails the same way, count still compensated.
    let err = store.lease_by_region("de").unwrap_err();
    assert!(matches!(err, Error::PayloadOpen { .. }));
    assert_eq!(info.lease_count(), 0);

    // Once the backend recovers the descriptor is usable as-is.
    store.backend().set_fail_open(false);
    let lease = store.lease_by_region("de").unwrap();
    assert!(lease.is_active());
    assert_eq!(info.lease_count(), 1);

    drop(lease);
    store.cleanup();
}

#[test]
fn test_reregister_resurrects_marked_descriptor() {
    let store = store();

    let (held, _) = store.register(file("de", 10)).unwrap();
    store.deregister("de"); // deferred
    assert!(!store.is_loaded("de"));

    // Same version arrives again: the mark is undone, same identity.
    let (lease, newly_registered) = store.register(file("de", 10)).unwrap();
    assert!(!newly_registered);
    assert!(lease.is_active());
    assert_eq!(lease.id(), held.id());
    assert!(store.is_loaded("de"));

    drop(lease);
    drop(held);
    // The deregistration was cancelled; the hook never fired.
    assert!(store.backend().deregistered().is_empty());
    assert_eq!(store.cache_len(), 1);

    store.cleanup();
}

#[test]
fn test_concurrent_register_and_lease() {
    let store = MapStore::with_cache_capacity(FakeBackend::new(), 4);

    std::thread::scope(|s| {
        for t in 0..4 {
            let store = &store;
            s.spawn(move || {
                let region = format!("r{t}");
                for version in 1..=10 {
                    let (lease, _) = store.register(file(&region, version)).unwrap();
                    assert!(lease.is_active());
                    drop(lease);

                    let lease = store.lease_by_region(&region).unwrap();
                    assert!(lease.is_active());
                    drop(lease);

                    // Every thread also hammers one shared region with the
                    // same version: always the idempotent path.
                    let (shared, _) = store.register(file("shared", 1)).unwrap();
                    assert!(shared.is_active());
                    drop(shared);
                }
            });
        }
    });

    assert_eq!(store.region_count(), 5);
    // Each private region upgraded nine times; the shared one never did.
    assert_eq!(store.backend().deregistered().len(), 4 * 9);
    for t in 0..4 {
        assert!(store.is_loaded(&format!("r{t}")));
        assert_eq!(store.id_by_region(&format!("r{t}")).info().unwrap().version(), 10);
    }

    store.deregister_all();
    assert_eq!(store.backend().deregistered().len(), 4 * 9 + 5);
    assert_eq!(store.region_count(), 0);

    store.cleanup();
}
