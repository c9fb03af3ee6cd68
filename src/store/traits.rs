//! Abstract storage traits for the reconciled snapshot.
//!
//! One trait per entity kind, mirroring the three change streams. All
//! writes are sequence-gated: the store keeps a per-id watermark and only
//! admits events that are strictly newer, which makes replays idempotent
//! and out-of-order delivery safe without any global ordering.

use crate::alert::{Alert, AlertId};
use crate::error::StoreError;
use crate::request::{DistressRequest, RequestId};
use crate::zone::{SafeZone, ZoneId};

/// Outcome of a sequence-gated write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The write was admitted and is reflected in the snapshot.
    Applied,
    /// The event lost last-writer-wins against the stored watermark and
    /// was dropped. Not an error; replays land here.
    Stale {
        /// The watermark already stored for the id.
        stored: u64,
    },
}

impl Admission {
    /// Returns true if the write changed the store.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Storage contract for hazard alerts.
pub trait AlertStore: Send + Sync {
    /// Full-record upsert, admitted iff `sequence` beats the id's watermark.
    fn upsert(&self, alert: Alert, sequence: u64) -> Result<Admission, StoreError>;

    /// Remove the id if present (no-op otherwise), gated like an upsert.
    /// The watermark survives as a tombstone so late updates stay dropped.
    fn delete(&self, id: AlertId, sequence: u64) -> Result<Admission, StoreError>;

    /// Get one alert by id.
    fn get(&self, id: AlertId) -> Result<Option<Alert>, StoreError>;

    /// Clone the full collection.
    fn snapshot(&self) -> Result<Vec<Alert>, StoreError>;

    /// Number of live records.
    fn count(&self) -> Result<usize, StoreError>;
}

/// Storage contract for distress requests.
pub trait RequestStore: Send + Sync {
    /// Full-record upsert, admitted iff `sequence` beats the id's watermark.
    fn upsert(&self, request: DistressRequest, sequence: u64)
        -> Result<Admission, StoreError>;

    /// Remove the id if present (no-op otherwise), gated like an upsert.
    fn delete(&self, id: RequestId, sequence: u64) -> Result<Admission, StoreError>;

    /// Get one request by id.
    fn get(&self, id: RequestId) -> Result<Option<DistressRequest>, StoreError>;

    /// Clone the full collection.
    fn snapshot(&self) -> Result<Vec<DistressRequest>, StoreError>;

    /// Number of live records.
    fn count(&self) -> Result<usize, StoreError>;
}

/// Storage contract for safe zones.
///
/// Implementations own the occupancy invariant: a stored zone never
/// reports `current_occupancy > capacity` (see `SafeZone::clamp_occupancy`).
pub trait ZoneStore: Send + Sync {
    /// Full-record upsert, admitted iff `sequence` beats the id's watermark.
    fn upsert(&self, zone: SafeZone, sequence: u64) -> Result<Admission, StoreError>;

    /// Remove the id if present (no-op otherwise), gated like an upsert.
    fn delete(&self, id: ZoneId, sequence: u64) -> Result<Admission, StoreError>;

    /// Get one zone by id.
    fn get(&self, id: ZoneId) -> Result<Option<SafeZone>, StoreError>;

    /// Clone the full collection.
    fn snapshot(&self) -> Result<Vec<SafeZone>, StoreError>;

    /// Number of live records.
    fn count(&self) -> Result<usize, StoreError>;
}
