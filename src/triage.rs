//! Triage scoring over the alert snapshot.
//!
//! Scoring is a total function of the current snapshot. No state is
//! carried between computations, so correctness under interleaved updates
//! reduces to "function of latest snapshot" and there is no incremental
//! aggregation to get wrong.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::alert::{Alert, SeverityLevel};

/// Alert counts over the fixed severity domain.
///
/// The four known buckets are always present (zero when empty). Alerts
/// whose producer shipped a severity outside the domain land in `unknown`
/// instead of being dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityDistribution {
    /// Count of `Critical` alerts.
    pub critical: usize,
    /// Count of `High` alerts.
    pub high: usize,
    /// Count of `Medium` alerts.
    pub medium: usize,
    /// Count of `Low` alerts.
    pub low: usize,
    /// Count of alerts with an out-of-domain severity string.
    pub unknown: usize,
}

impl SeverityDistribution {
    /// Total alerts counted across all buckets.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.unknown
    }
}

/// Rollup statistics over one alert snapshot.
///
/// # Examples
///
/// ```
/// use muster::TriageSummary;
///
/// let summary = TriageSummary::compute(&[]);
/// assert_eq!(summary.average_probability, 0.0);
/// assert_eq!(summary.severity_distribution.critical, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriageSummary {
    /// Number of alerts in the snapshot.
    pub alert_count: usize,

    /// Alerts with status `Active`.
    pub active_count: usize,

    /// Alerts with severity `Critical` (any status).
    pub critical_count: usize,

    /// Arithmetic mean probability across all alerts; 0.0 when empty.
    pub average_probability: f64,

    /// Alert count per disaster type.
    pub type_distribution: BTreeMap<String, usize>,

    /// Alert count per severity bucket.
    pub severity_distribution: SeverityDistribution,
}

impl TriageSummary {
    /// Scores the given snapshot.
    #[must_use]
    pub fn compute(alerts: &[Alert]) -> Self {
        let mut summary = Self {
            alert_count: alerts.len(),
            ..Self::default()
        };

        let mut probability_sum = 0.0;
        for alert in alerts {
            if alert.is_active() {
                summary.active_count += 1;
            }
            probability_sum += alert.probability;

            *summary
                .type_distribution
                .entry(alert.disaster_type.clone())
                .or_insert(0) += 1;

            let dist = &mut summary.severity_distribution;
            match &alert.severity {
                SeverityLevel::Critical => {
                    dist.critical += 1;
                    summary.critical_count += 1;
                }
                SeverityLevel::High => dist.high += 1,
                SeverityLevel::Medium => dist.medium += 1,
                SeverityLevel::Low => dist.low += 1,
                SeverityLevel::Unknown(_) => dist.unknown += 1,
            }
        }

        if !alerts.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            {
                summary.average_probability = probability_sum / alerts.len() as f64;
            }
        }

        summary
    }

    /// Percentage share of a disaster type in the snapshot, in [0, 100].
    #[must_use]
    pub fn type_share(&self, disaster_type: &str) -> f64 {
        if self.alert_count == 0 {
            return 0.0;
        }
        let count = self
            .type_distribution
            .get(disaster_type)
            .copied()
            .unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        {
            count as f64 / self.alert_count as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::alert::AlertStatus;
    use crate::geo::GeoPoint;

    fn mk(severity: SeverityLevel, probability: f64, status: AlertStatus) -> Alert {
        let mut alert = Alert::new(
            "flood",
            severity,
            probability,
            GeoPoint::new(0.0, 0.0).unwrap(),
        );
        alert.status = status;
        alert
    }

    #[test]
    fn empty_snapshot_scores_zero_everywhere() {
        let summary = TriageSummary::compute(&[]);
        assert_eq!(summary.alert_count, 0);
        assert_eq!(summary.active_count, 0);
        assert_eq!(summary.critical_count, 0);
        assert_eq!(summary.average_probability, 0.0);
        assert!(summary.type_distribution.is_empty());
        assert_eq!(summary.severity_distribution, SeverityDistribution::default());
        assert_eq!(summary.type_share("flood"), 0.0);
    }

    #[test]
    fn severity_distribution_always_has_all_fixed_buckets() {
        // Even with alerts of one severity, the other buckets read zero.
        let alerts = vec![mk(SeverityLevel::High, 10.0, AlertStatus::Active)];
        let dist = TriageSummary::compute(&alerts).severity_distribution;
        assert_eq!(dist.critical, 0);
        assert_eq!(dist.high, 1);
        assert_eq!(dist.medium, 0);
        assert_eq!(dist.low, 0);
        assert_eq!(dist.unknown, 0);
        assert_eq!(dist.total(), 1);
    }

    #[test]
    fn two_critical_one_high() {
        let alerts = vec![
            mk(SeverityLevel::Critical, 80.0, AlertStatus::Active),
            mk(SeverityLevel::Critical, 90.0, AlertStatus::Active),
            mk(SeverityLevel::High, 40.0, AlertStatus::Active),
        ];
        let summary = TriageSummary::compute(&alerts);
        let dist = summary.severity_distribution;
        assert_eq!((dist.critical, dist.high, dist.medium, dist.low), (2, 1, 0, 0));
        assert_eq!(summary.critical_count, 2);
        assert!((summary.average_probability - 70.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_severity_is_counted_not_dropped() {
        let alerts = vec![
            mk(SeverityLevel::Unknown("severe".to_string()), 50.0, AlertStatus::Active),
            mk(SeverityLevel::Low, 10.0, AlertStatus::Active),
        ];
        let summary = TriageSummary::compute(&alerts);
        assert_eq!(summary.severity_distribution.unknown, 1);
        assert_eq!(summary.severity_distribution.total(), 2);
    }

    #[test]
    fn active_and_critical_counts_are_independent() {
        let alerts = vec![
            mk(SeverityLevel::Critical, 80.0, AlertStatus::Resolved),
            mk(SeverityLevel::Low, 20.0, AlertStatus::Active),
            mk(SeverityLevel::Medium, 30.0, AlertStatus::Expired),
        ];
        let summary = TriageSummary::compute(&alerts);
        assert_eq!(summary.active_count, 1);
        assert_eq!(summary.critical_count, 1);
    }

    #[test]
    fn type_distribution_and_share() {
        let mut quake = mk(SeverityLevel::High, 60.0, AlertStatus::Active);
        quake.disaster_type = "earthquake".to_string();
        let alerts = vec![
            mk(SeverityLevel::High, 10.0, AlertStatus::Active),
            mk(SeverityLevel::Low, 20.0, AlertStatus::Active),
            mk(SeverityLevel::Low, 30.0, AlertStatus::Active),
            quake,
        ];
        let summary = TriageSummary::compute(&alerts);
        assert_eq!(summary.type_distribution["flood"], 3);
        assert_eq!(summary.type_distribution["earthquake"], 1);
        assert!((summary.type_share("flood") - 75.0).abs() < 1e-9);
        assert!((summary.type_share("earthquake") - 25.0).abs() < 1e-9);
        assert_eq!(summary.type_share("wildfire"), 0.0);
    }

    #[test]
    fn recomputation_is_a_pure_function_of_the_snapshot() {
        let alerts = vec![
            mk(SeverityLevel::Critical, 80.0, AlertStatus::Active),
            mk(SeverityLevel::Medium, 35.0, AlertStatus::Active),
        ];
        assert_eq!(TriageSummary::compute(&alerts), TriageSummary::compute(&alerts));
    }
}
