//! In-memory storage backend.
//!
//! Thread-safe in-memory implementations of the store traits, guarded by
//! `RwLock`. This is the backend the sync runtime uses; it is also the
//! reference implementation for the sequence-gating semantics.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use crate::alert::{Alert, AlertId};
use crate::error::StoreError;
use crate::request::{DistressRequest, RequestId};
use crate::store::traits::{Admission, AlertStore, RequestStore, ZoneStore};
use crate::zone::{SafeZone, ZoneId};

fn lock_err(context: &'static str) -> StoreError {
    StoreError::Poisoned { context }
}

/// Admits a write iff `sequence` is strictly newer than the stored
/// watermark, advancing the watermark on admission. Watermarks are kept
/// forever (including across deletes) so a late update for a deleted id
/// still loses last-writer-wins.
fn admit<K: Eq + Hash>(
    watermarks: &mut HashMap<K, u64>,
    id: K,
    sequence: u64,
) -> Admission {
    match watermarks.get(&id) {
        Some(&stored) if sequence <= stored => Admission::Stale { stored },
        _ => {
            watermarks.insert(id, sequence);
            Admission::Applied
        }
    }
}

#[derive(Debug, Default)]
struct AlertState {
    by_id: HashMap<AlertId, Alert>,
    watermarks: HashMap<AlertId, u64>,
}

/// Thread-safe in-memory alert store.
#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    state: RwLock<AlertState>,
}

impl InMemoryAlertStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertStore for InMemoryAlertStore {
    fn upsert(&self, alert: Alert, sequence: u64) -> Result<Admission, StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("alert.upsert"))?;
        let admission = admit(&mut state.watermarks, alert.id, sequence);
        if admission.is_applied() {
            state.by_id.insert(alert.id, alert);
        }
        Ok(admission)
    }

    fn delete(&self, id: AlertId, sequence: u64) -> Result<Admission, StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("alert.delete"))?;
        let admission = admit(&mut state.watermarks, id, sequence);
        if admission.is_applied() {
            state.by_id.remove(&id);
        }
        Ok(admission)
    }

    fn get(&self, id: AlertId) -> Result<Option<Alert>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("alert.get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    fn snapshot(&self) -> Result<Vec<Alert>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("alert.snapshot"))?;
        Ok(state.by_id.values().cloned().collect())
    }

    fn count(&self) -> Result<usize, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("alert.count"))?;
        Ok(state.by_id.len())
    }
}

#[derive(Debug, Default)]
struct RequestState {
    by_id: HashMap<RequestId, DistressRequest>,
    watermarks: HashMap<RequestId, u64>,
}

/// Thread-safe in-memory distress request store.
#[derive(Debug, Default)]
pub struct InMemoryRequestStore {
    state: RwLock<RequestState>,
}

impl InMemoryRequestStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RequestStore for InMemoryRequestStore {
    fn upsert(
        &self,
        request: DistressRequest,
        sequence: u64,
    ) -> Result<Admission, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("request.upsert"))?;
        let admission = admit(&mut state.watermarks, request.id, sequence);
        if admission.is_applied() {
            state.by_id.insert(request.id, request);
        }
        Ok(admission)
    }

    fn delete(&self, id: RequestId, sequence: u64) -> Result<Admission, StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("request.delete"))?;
        let admission = admit(&mut state.watermarks, id, sequence);
        if admission.is_applied() {
            state.by_id.remove(&id);
        }
        Ok(admission)
    }

    fn get(&self, id: RequestId) -> Result<Option<DistressRequest>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("request.get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    fn snapshot(&self) -> Result<Vec<DistressRequest>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("request.snapshot"))?;
        Ok(state.by_id.values().cloned().collect())
    }

    fn count(&self) -> Result<usize, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("request.count"))?;
        Ok(state.by_id.len())
    }
}

#[derive(Debug, Default)]
struct ZoneState {
    by_id: HashMap<ZoneId, SafeZone>,
    watermarks: HashMap<ZoneId, u64>,
}

/// Thread-safe in-memory safe zone store.
///
/// Enforces the occupancy invariant on every admitted upsert: a reported
/// occupancy above capacity is clamped and the record flagged.
#[derive(Debug, Default)]
pub struct InMemoryZoneStore {
    state: RwLock<ZoneState>,
}

impl InMemoryZoneStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ZoneStore for InMemoryZoneStore {
    fn upsert(&self, mut zone: SafeZone, sequence: u64) -> Result<Admission, StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("zone.upsert"))?;
        let admission = admit(&mut state.watermarks, zone.id, sequence);
        if admission.is_applied() {
            zone.clamp_occupancy();
            state.by_id.insert(zone.id, zone);
        }
        Ok(admission)
    }

    fn delete(&self, id: ZoneId, sequence: u64) -> Result<Admission, StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("zone.delete"))?;
        let admission = admit(&mut state.watermarks, id, sequence);
        if admission.is_applied() {
            state.by_id.remove(&id);
        }
        Ok(admission)
    }

    fn get(&self, id: ZoneId) -> Result<Option<SafeZone>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("zone.get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    fn snapshot(&self) -> Result<Vec<SafeZone>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("zone.snapshot"))?;
        Ok(state.by_id.values().cloned().collect())
    }

    fn count(&self) -> Result<usize, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("zone.count"))?;
        Ok(state.by_id.len())
    }
}

/// Convenience bundle of in-memory stores.
#[derive(Debug, Default)]
pub struct InMemoryStores {
    /// Alert store.
    pub alerts: InMemoryAlertStore,
    /// Distress request store.
    pub requests: InMemoryRequestStore,
    /// Safe zone store.
    pub zones: InMemoryZoneStore,
}

impl InMemoryStores {
    /// Create a new bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
