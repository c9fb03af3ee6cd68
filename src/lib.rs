//! # muster - Live Emergency-State Synchronization and Triage Core
//!
//! muster keeps an emergency-operations dashboard consistent under
//! continuous, unordered updates from independent sources. Three entity
//! streams (hazard alerts, distress requests, safe zones) are reconciled
//! into one queryable snapshot; triage metrics and shelter assignments are
//! recomputed as the snapshot changes.
//!
//! ## Core Concepts
//!
//! - **ChangeEvent**: an at-least-once, per-id-sequenced upsert or delete
//!   from an external source
//! - **Reconciler**: the single writer; applies events idempotently with
//!   last-writer-wins per id
//! - **TriageSummary**: pure rollup over the alert snapshot
//! - **Capacity matching**: advisory assignment of each pending request to
//!   the best eligible safe zone
//! - **QueryFacade**: immutable point-in-time views for readers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use muster::{Reconciler, SyncRuntime, SyncRuntimeConfig};
//!
//! let runtime = SyncRuntime::start(Reconciler::in_memory(), SyncRuntimeConfig::default());
//! let facade = runtime.facade();
//!
//! // Feed change events from the notification transport.
//! runtime.submit(event)?;
//!
//! // Readers observe fully-applied snapshots only.
//! let view = facade.snapshot()?;
//! println!("{} active alerts", view.triage.active_count);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alert;
pub mod error;
pub mod event;
pub mod facade;
pub mod geo;
pub mod matcher;
pub mod reconciler;
pub mod request;
pub mod store;
pub mod triage;
pub mod zone;

// Re-export primary types at crate root for convenience
pub use alert::{Alert, AlertId, AlertStatus, SeverityLevel};
pub use error::{MusterError, MusterResult, RuntimeError, StoreError, ValidationError};
pub use event::{ChangeEvent, ChangeKind, EntityKind, PROVISIONAL_SEQ};
pub use facade::{DashboardView, QueryFacade};
pub use geo::GeoPoint;
pub use matcher::{match_requests, Assignment, MatchOutcome};
pub use reconciler::runtime::{SyncRuntime, SyncRuntimeConfig};
pub use reconciler::{ApplyOutcome, BatchReport, Reconciler};
pub use request::{
    DistressCall, DistressRequest, EmergencyType, RequestId, RequestPriority, RequestStatus,
};
pub use store::{
    Admission, AlertStore, InMemoryAlertStore, InMemoryRequestStore, InMemoryStores,
    InMemoryZoneStore, RequestStore, ZoneStore,
};
pub use triage::{SeverityDistribution, TriageSummary};
pub use zone::{SafeZone, ZoneId, ZoneType};
