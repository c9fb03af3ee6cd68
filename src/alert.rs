//! Hazard alert records.
//!
//! Alerts are produced by external detection systems. The core never
//! originates them; it only reconciles the change stream into a snapshot
//! and scores what it is given. Severity and probability are set
//! independently by the producer, so any combination must be tolerated.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::geo::GeoPoint;

/// Stable identifier of a hazard alert.
///
/// # Examples
///
/// ```
/// use muster::AlertId;
///
/// let id = AlertId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AlertId(Uuid);

impl AlertId {
    /// Creates a new random alert ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an alert ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Severity assigned by the alert producer.
///
/// Producers are external and occasionally ship severities outside the
/// known domain. Those are preserved verbatim as [`SeverityLevel::Unknown`]
/// and surfaced by the triage scorer instead of being silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeverityLevel {
    /// Routine, low-impact hazard.
    Low,
    /// Elevated hazard.
    Medium,
    /// Serious hazard.
    High,
    /// Life-threatening hazard.
    Critical,
    /// A severity string outside the known domain, kept as received.
    Unknown(String),
}

impl SeverityLevel {
    /// Parses a producer severity string, preserving unknown values.
    ///
    /// # Examples
    ///
    /// ```
    /// use muster::SeverityLevel;
    ///
    /// assert_eq!(SeverityLevel::parse("Critical"), SeverityLevel::Critical);
    /// assert_eq!(
    ///     SeverityLevel::parse("Apocalyptic"),
    ///     SeverityLevel::Unknown("Apocalyptic".to_string())
    /// );
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Low" => Self::Low,
            "Medium" => Self::Medium,
            "High" => Self::High,
            "Critical" => Self::Critical,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// The wire representation of this severity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SeverityLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SeverityLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Lifecycle status of an alert. Transitions are driven by the external
/// producer, never by this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertStatus {
    /// The hazard is ongoing.
    Active,
    /// The hazard has been resolved.
    Resolved,
    /// The alert aged out without resolution.
    Expired,
}

/// A hazard alert as reconciled into the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Stable key for reconciliation.
    pub id: AlertId,

    /// Open, enum-like hazard category ("flood", "earthquake", ...).
    pub disaster_type: String,

    /// Producer-assigned severity.
    pub severity: SeverityLevel,

    /// Estimated probability in percent. Clamped to [0, 100] on decode.
    pub probability: f64,

    /// Geographic center of the hazard.
    pub position: GeoPoint,

    /// Affected radius around the position, in kilometres.
    #[serde(default)]
    pub affected_radius_km: f64,

    /// Lifecycle status.
    pub status: AlertStatus,

    /// Short human-readable headline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// When the hazard is predicted to make impact, if forecast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_impact_time: Option<DateTime<Utc>>,

    /// When the producer created the alert.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Alert {
    /// Creates an active alert with sensible defaults for the optional
    /// fields. Mostly useful in tests and examples.
    #[must_use]
    pub fn new(
        disaster_type: impl Into<String>,
        severity: SeverityLevel,
        probability: f64,
        position: GeoPoint,
    ) -> Self {
        Self {
            id: AlertId::new(),
            disaster_type: disaster_type.into(),
            severity,
            probability: probability.clamp(0.0, 100.0),
            position,
            affected_radius_km: 0.0,
            status: AlertStatus::Active,
            title: None,
            description: None,
            predicted_impact_time: None,
            created_at: Utc::now(),
        }
    }

    /// Validates ranges and clamps probability into [0, 100].
    ///
    /// Non-finite probability and negative radius are malformed input and
    /// rejected; an out-of-range but finite probability is clamped, since
    /// the producer owns the field and the snapshot must still reflect it.
    pub fn normalize(&mut self) -> Result<(), ValidationError> {
        self.position.validate()?;

        if !self.probability.is_finite() {
            return Err(ValidationError::OutOfRange {
                field: "probability",
                value: self.probability,
            });
        }
        self.probability = self.probability.clamp(0.0, 100.0);

        if !self.affected_radius_km.is_finite() || self.affected_radius_km < 0.0 {
            return Err(ValidationError::OutOfRange {
                field: "affected_radius_km",
                value: self.affected_radius_km,
            });
        }

        if self.disaster_type.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                field: "disaster_type",
            });
        }

        Ok(())
    }

    /// Returns true if the alert is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }
}
