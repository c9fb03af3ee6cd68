//! Capacity-constrained matching of pending requests to safe zones.
//!
//! Matching is advisory: the result is a recommendation handed back to the
//! caller, never a mutation of zone occupancy. Occupancy changes arrive
//! only through the reconciler, so the matcher can be re-run on every
//! recomputation without side effects accumulating.

use serde::{Deserialize, Serialize};

use crate::request::{DistressRequest, RequestId};
use crate::zone::{SafeZone, ZoneId};

/// Where one pending request should go.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// The best eligible zone for this request.
    Assigned {
        /// The recommended zone.
        zone_id: ZoneId,
        /// Great-circle distance from request to zone, in kilometres.
        distance_km: f64,
        /// Free places in the zone at snapshot time.
        headroom: u32,
    },
    /// No active zone with free capacity exists.
    Unassignable,
}

impl MatchOutcome {
    /// Returns true if a zone was recommended.
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned { .. })
    }
}

/// Advisory assignment for one pending request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// The request being placed.
    pub request_id: RequestId,
    /// The recommendation.
    pub outcome: MatchOutcome,
}

/// Matches every pending request to its best eligible zone.
///
/// Eligibility: `is_active` and `current_occupancy < capacity`. Ranking:
/// distance ascending, then headroom descending, then zone id ascending as
/// the final tie-break, so an identical snapshot always produces an
/// identical assignment list. Each request is matched independently
/// against the same snapshot; headroom is not consumed between requests.
///
/// Output is ordered by (priority, created_at, id) of the request.
#[must_use]
pub fn match_requests(requests: &[DistressRequest], zones: &[SafeZone]) -> Vec<Assignment> {
    let eligible: Vec<&SafeZone> = zones.iter().filter(|z| z.is_eligible()).collect();

    let mut pending: Vec<&DistressRequest> =
        requests.iter().filter(|r| r.is_pending()).collect();
    pending.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    pending
        .into_iter()
        .map(|request| Assignment {
            request_id: request.id,
            outcome: best_zone_for(request, &eligible),
        })
        .collect()
}

fn best_zone_for(request: &DistressRequest, eligible: &[&SafeZone]) -> MatchOutcome {
    eligible
        .iter()
        .map(|zone| {
            (
                request.position.distance_km(zone.position),
                zone.headroom(),
                zone.id,
            )
        })
        .min_by(|(d_a, h_a, id_a), (d_b, h_b, id_b)| {
            d_a.total_cmp(d_b)
                .then_with(|| h_b.cmp(h_a))
                .then_with(|| id_a.cmp(id_b))
        })
        .map_or(MatchOutcome::Unassignable, |(distance_km, headroom, zone_id)| {
            MatchOutcome::Assigned {
                zone_id,
                distance_km,
                headroom,
            }
        })
}
