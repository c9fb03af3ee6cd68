//! Read-only query facade over the reconciled state.
//!
//! The reconciler publishes a fully-built, immutable [`DashboardView`]
//! behind the facade; readers clone an `Arc` and therefore always observe
//! one consistent point-in-time state. A view is only ever swapped in as a
//! whole, so no reader can see a partially-applied change or a partially
//! recomputed summary.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::Alert;
use crate::error::{MusterResult, StoreError};
use crate::matcher::Assignment;
use crate::request::DistressRequest;
use crate::triage::TriageSummary;
use crate::zone::SafeZone;

/// One published, immutable state of the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardView {
    /// All alerts, newest first.
    pub alerts: Vec<Alert>,

    /// All distress requests, newest first.
    pub requests: Vec<DistressRequest>,

    /// All safe zones, by name.
    pub zones: Vec<SafeZone>,

    /// Triage rollup over `alerts`.
    pub triage: TriageSummary,

    /// Advisory assignments for the pending subset of `requests`.
    pub assignments: Vec<Assignment>,

    /// When this view was published.
    #[serde(default = "default_published_at")]
    pub published_at: DateTime<Utc>,
}

fn default_published_at() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

impl DashboardView {
    /// The view a fresh facade holds before anything is published.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            alerts: Vec::new(),
            requests: Vec::new(),
            zones: Vec::new(),
            triage: TriageSummary::default(),
            assignments: Vec::new(),
            published_at: DateTime::UNIX_EPOCH,
        }
    }
}

impl Default for DashboardView {
    fn default() -> Self {
        Self::empty()
    }
}

/// Cheaply cloneable read handle for external consumers.
///
/// The presentation layer and notifiers read through this handle only;
/// nothing on this type can mutate the entity stores.
#[derive(Debug, Clone)]
pub struct QueryFacade {
    view: Arc<RwLock<Arc<DashboardView>>>,
}

impl QueryFacade {
    /// Creates a facade holding an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self {
            view: Arc::new(RwLock::new(Arc::new(DashboardView::empty()))),
        }
    }

    /// Returns the current published view.
    pub fn snapshot(&self) -> MusterResult<Arc<DashboardView>> {
        let guard = self
            .view
            .read()
            .map_err(|_| StoreError::Poisoned { context: "facade.snapshot" })?;
        Ok(Arc::clone(&guard))
    }

    /// Returns the triage summary of the current view.
    pub fn triage_summary(&self) -> MusterResult<TriageSummary> {
        Ok(self.snapshot()?.triage.clone())
    }

    /// Returns the advisory assignments of the current view.
    pub fn assignments(&self) -> MusterResult<Vec<Assignment>> {
        Ok(self.snapshot()?.assignments.clone())
    }

    /// Swaps in a freshly built view. Reconciler-only.
    pub(crate) fn publish(&self, view: DashboardView) -> MusterResult<()> {
        let mut guard = self
            .view
            .write()
            .map_err(|_| StoreError::Poisoned { context: "facade.publish" })?;
        *guard = Arc::new(view);
        Ok(())
    }
}

impl Default for QueryFacade {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::alert::SeverityLevel;
    use crate::geo::GeoPoint;

    #[test]
    fn fresh_facade_holds_an_empty_view() {
        let facade = QueryFacade::new();
        let view = facade.snapshot().unwrap();
        assert!(view.alerts.is_empty());
        assert!(view.assignments.is_empty());
        assert_eq!(view.triage.alert_count, 0);
        assert_eq!(view.published_at, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn clones_observe_the_same_published_view() {
        let facade = QueryFacade::new();
        let reader = facade.clone();

        let alert = Alert::new(
            "flood",
            SeverityLevel::High,
            55.0,
            GeoPoint::new(0.0, 0.0).unwrap(),
        );
        let view = DashboardView {
            alerts: vec![alert],
            triage: TriageSummary::compute(&[]),
            published_at: Utc::now(),
            ..DashboardView::default()
        };
        facade.publish(view).unwrap();

        let a = facade.snapshot().unwrap();
        let b = reader.snapshot().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.alerts.len(), 1);
    }

    #[test]
    fn old_snapshots_stay_valid_after_a_new_publish() {
        let facade = QueryFacade::new();
        let before = facade.snapshot().unwrap();

        facade
            .publish(DashboardView {
                published_at: Utc::now(),
                ..DashboardView::default()
            })
            .unwrap();

        // The earlier Arc still reads the state it captured.
        assert_eq!(before.published_at, DateTime::UNIX_EPOCH);
        let after = facade.snapshot().unwrap();
        assert!(after.published_at > before.published_at);
    }
}
