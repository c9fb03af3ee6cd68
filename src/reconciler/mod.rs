//! Reconciliation of change events into the entity stores.
//!
//! The reconciler is the only writer of the three stores. It decodes raw
//! change payloads, validates them, applies them with sequence-gated
//! last-writer-wins semantics, and republishes the derived view once a
//! batch of applies has settled. Malformed events are rejected one at a
//! time and never abort the batch.

pub mod runtime;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, warn};

use crate::alert::{Alert, AlertId};
use crate::error::{MusterError, MusterResult, StoreError, ValidationError};
use crate::event::{ChangeEvent, EntityKind, PROVISIONAL_SEQ};
use crate::facade::{DashboardView, QueryFacade};
use crate::matcher::match_requests;
use crate::request::{DistressCall, DistressRequest, RequestId};
use crate::store::{Admission, AlertStore, InMemoryStores, RequestStore, ZoneStore};
use crate::triage::TriageSummary;
use crate::zone::{SafeZone, ZoneId};

/// What happened to a single change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The event was admitted and mutated its store.
    Applied {
        /// Entity kind that changed.
        kind: EntityKind,
    },
    /// The event lost last-writer-wins and was silently dropped.
    Stale {
        /// Entity kind the event targeted.
        kind: EntityKind,
        /// Watermark already stored for the id.
        stored: u64,
        /// Sequence number the event carried.
        sequence: u64,
    },
}

/// Tally of one settled batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Events admitted into a store.
    pub applied: usize,
    /// Events dropped by last-writer-wins.
    pub stale: usize,
    /// Events rejected as malformed.
    pub rejected: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct DirtyFlags {
    alerts: bool,
    requests: bool,
    zones: bool,
}

impl DirtyFlags {
    const fn any(self) -> bool {
        self.alerts || self.requests || self.zones
    }
}

/// Single-writer reconciliation core over pluggable stores.
///
/// Change events from the three streams must be serialized before they
/// reach [`Reconciler::apply`]; use
/// [`SyncRuntime`](crate::reconciler::runtime::SyncRuntime) when producers
/// are concurrent.
pub struct Reconciler {
    alerts: Arc<dyn AlertStore>,
    requests: Arc<dyn RequestStore>,
    zones: Arc<dyn ZoneStore>,
    facade: QueryFacade,
    dirty: Mutex<DirtyFlags>,
    recompute_passes: AtomicU64,
}

impl Reconciler {
    /// Create a reconciler over the given stores.
    #[must_use]
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        requests: Arc<dyn RequestStore>,
        zones: Arc<dyn ZoneStore>,
    ) -> Self {
        Self {
            alerts,
            requests,
            zones,
            facade: QueryFacade::new(),
            dirty: Mutex::new(DirtyFlags::default()),
            recompute_passes: AtomicU64::new(0),
        }
    }

    /// Create a reconciler backed by fresh in-memory stores.
    #[must_use]
    pub fn in_memory() -> Self {
        let stores = InMemoryStores::new();
        Self::new(
            Arc::new(stores.alerts),
            Arc::new(stores.requests),
            Arc::new(stores.zones),
        )
    }

    /// A read handle onto the published view.
    #[must_use]
    pub fn facade(&self) -> QueryFacade {
        self.facade.clone()
    }

    /// Shared reference to the alert store.
    #[must_use]
    pub fn alert_store(&self) -> &Arc<dyn AlertStore> {
        &self.alerts
    }

    /// Shared reference to the request store.
    #[must_use]
    pub fn request_store(&self) -> &Arc<dyn RequestStore> {
        &self.requests
    }

    /// Shared reference to the zone store.
    #[must_use]
    pub fn zone_store(&self) -> &Arc<dyn ZoneStore> {
        &self.zones
    }

    /// Number of derived-view publishes so far.
    ///
    /// A burst of events settled as one batch counts as one pass; this is
    /// how burst coalescing is observed from the outside.
    #[must_use]
    pub fn recompute_passes(&self) -> u64 {
        self.recompute_passes.load(Ordering::Relaxed)
    }

    /// Applies one change event to its store.
    ///
    /// Does not republish the derived view; callers batch applies and then
    /// call [`Reconciler::republish`] (or use `apply_batch`, which does
    /// both).
    ///
    /// # Errors
    ///
    /// `ValidationError` when the payload is malformed; `StoreError` when
    /// the backend fails. A stale event is an `Ok` outcome, not an error.
    pub fn apply(&self, event: &ChangeEvent) -> MusterResult<ApplyOutcome> {
        let admission = if event.change.is_upsert() {
            match event.kind {
                EntityKind::Alert => {
                    let alert = decode_alert(event)?;
                    self.alerts.upsert(alert, event.sequence)?
                }
                EntityKind::Request => {
                    let request = decode_request(event)?;
                    self.requests.upsert(request, event.sequence)?
                }
                EntityKind::Zone => {
                    let zone = decode_zone(event)?;
                    if zone.current_occupancy > zone.capacity {
                        warn!(
                            zone = %zone.id,
                            occupancy = zone.current_occupancy,
                            capacity = zone.capacity,
                            "reported occupancy exceeds capacity; clamping"
                        );
                    }
                    self.zones.upsert(zone, event.sequence)?
                }
            }
        } else {
            let id = event.delete_target()?;
            match event.kind {
                EntityKind::Alert => self
                    .alerts
                    .delete(AlertId::from_uuid(id), event.sequence)?,
                EntityKind::Request => self
                    .requests
                    .delete(RequestId::from_uuid(id), event.sequence)?,
                EntityKind::Zone => self.zones.delete(ZoneId::from_uuid(id), event.sequence)?,
            }
        };

        match admission {
            Admission::Applied => {
                self.mark_dirty(event.kind)?;
                Ok(ApplyOutcome::Applied { kind: event.kind })
            }
            Admission::Stale { stored } => Ok(ApplyOutcome::Stale {
                kind: event.kind,
                stored,
                sequence: event.sequence,
            }),
        }
    }

    /// Applies a settled batch of events, then republishes once.
    ///
    /// Malformed events are rejected individually (warn-logged and
    /// counted); processing always continues with the next event.
    ///
    /// # Errors
    ///
    /// Only backend failures abort the batch.
    pub fn apply_batch(&self, events: &[ChangeEvent]) -> MusterResult<BatchReport> {
        let mut report = BatchReport::default();

        for event in events {
            match self.apply(event) {
                Ok(ApplyOutcome::Applied { .. }) => report.applied += 1,
                Ok(ApplyOutcome::Stale {
                    kind,
                    stored,
                    sequence,
                }) => {
                    debug!(%kind, stored, sequence, "dropped stale change event");
                    report.stale += 1;
                }
                Err(MusterError::Validation(err)) => {
                    warn!(kind = %event.kind, error = %err, "rejected change event");
                    report.rejected += 1;
                }
                Err(err) => return Err(err),
            }
        }

        self.republish()?;
        Ok(report)
    }

    /// Accepts a new distress request from an operator.
    ///
    /// The record is stored provisionally (sequence 0) with
    /// `status = Pending` and `priority = Critical`, and the view is
    /// republished so the request is immediately visible. The
    /// authoritative Insert event for the same id supersedes it later;
    /// duplicate deliveries collapse on the id.
    ///
    /// # Errors
    ///
    /// `ValidationError` when the call is incomplete or out of range.
    pub fn originate_distress(&self, call: DistressCall) -> MusterResult<DistressRequest> {
        let request = call.into_request().map_err(MusterError::Validation)?;

        let admission = self.requests.upsert(request.clone(), PROVISIONAL_SEQ)?;
        if admission.is_applied() {
            self.mark_dirty(EntityKind::Request)?;
            self.republish()?;
        } else {
            // The authoritative record for this id already arrived.
            debug!(request = %request.id, "provisional distress request already superseded");
        }

        Ok(request)
    }

    /// Rebuilds and publishes the derived view if anything is dirty.
    ///
    /// Returns true when a new view was published. Components whose inputs
    /// did not change are carried over from the previous view, so a
    /// zone-only batch does not recompute triage.
    pub fn republish(&self) -> MusterResult<bool> {
        let dirty = {
            let mut guard = self
                .dirty
                .lock()
                .map_err(|_| StoreError::Poisoned { context: "reconciler.dirty" })?;
            std::mem::take(&mut *guard)
        };

        if !dirty.any() {
            return Ok(false);
        }

        let previous = self.facade.snapshot()?;

        let alerts = if dirty.alerts {
            let mut alerts = self.alerts.snapshot()?;
            alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
            alerts
        } else {
            previous.alerts.clone()
        };

        let requests = if dirty.requests {
            let mut requests = self.requests.snapshot()?;
            requests
                .sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
            requests
        } else {
            previous.requests.clone()
        };

        let zones = if dirty.zones {
            let mut zones = self.zones.snapshot()?;
            zones.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
            zones
        } else {
            previous.zones.clone()
        };

        let triage = if dirty.alerts {
            TriageSummary::compute(&alerts)
        } else {
            previous.triage.clone()
        };

        let assignments = if dirty.requests || dirty.zones {
            match_requests(&requests, &zones)
        } else {
            previous.assignments.clone()
        };

        self.facade.publish(DashboardView {
            alerts,
            requests,
            zones,
            triage,
            assignments,
            published_at: Utc::now(),
        })?;

        self.recompute_passes.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    fn mark_dirty(&self, kind: EntityKind) -> MusterResult<()> {
        let mut guard = self
            .dirty
            .lock()
            .map_err(|_| StoreError::Poisoned { context: "reconciler.dirty" })?;
        match kind {
            EntityKind::Alert => guard.alerts = true,
            EntityKind::Request => guard.requests = true,
            EntityKind::Zone => guard.zones = true,
        }
        Ok(())
    }
}

fn decode_alert(event: &ChangeEvent) -> Result<Alert, ValidationError> {
    let mut alert: Alert = serde_json::from_value(event.payload.clone()).map_err(|e| {
        ValidationError::MalformedPayload {
            kind: EntityKind::Alert,
            reason: e.to_string(),
        }
    })?;
    alert.normalize()?;
    Ok(alert)
}

fn decode_request(event: &ChangeEvent) -> Result<DistressRequest, ValidationError> {
    let request: DistressRequest =
        serde_json::from_value(event.payload.clone()).map_err(|e| {
            ValidationError::MalformedPayload {
                kind: EntityKind::Request,
                reason: e.to_string(),
            }
        })?;
    request.validate()?;
    Ok(request)
}

fn decode_zone(event: &ChangeEvent) -> Result<SafeZone, ValidationError> {
    let zone: SafeZone = serde_json::from_value(event.payload.clone()).map_err(|e| {
        ValidationError::MalformedPayload {
            kind: EntityKind::Zone,
            reason: e.to_string(),
        }
    })?;
    zone.validate()?;
    Ok(zone)
}
