//! Safe zone (shelter) records.
//!
//! Occupancy is owned by an external source of truth. The core reflects
//! whatever it is told, but holds the invariant `current_occupancy <=
//! capacity` by clamping and flagging records that report more.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::geo::GeoPoint;

/// Stable identifier of a safe zone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ZoneId(Uuid);

impl ZoneId {
    /// Creates a new random zone ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a zone ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ZoneId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification of a safe zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneType {
    /// Emergency shelter.
    Shelter,
    /// Hospital.
    Hospital,
    /// Relief supply and coordination center.
    #[serde(rename = "Relief Center")]
    ReliefCenter,
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Shelter => "Shelter",
            Self::Hospital => "Hospital",
            Self::ReliefCenter => "Relief Center",
        };
        f.write_str(s)
    }
}

fn default_active() -> bool {
    true
}

/// A safe zone as reconciled into the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeZone {
    /// Stable key for reconciliation.
    pub id: ZoneId,

    /// Display name.
    pub name: String,

    /// Zone classification.
    #[serde(rename = "type")]
    pub zone_type: ZoneType,

    /// Location of the zone.
    pub position: GeoPoint,

    /// Maximum number of people the zone can hold.
    pub capacity: u32,

    /// People currently in the zone, as last reported. Never exceeds
    /// `capacity` after normalization.
    pub current_occupancy: u32,

    /// Available facilities ("water", "power", "medical", ...).
    #[serde(default)]
    pub facilities: BTreeSet<String>,

    /// Whether the zone is accepting people.
    #[serde(default = "default_active")]
    pub is_active: bool,

    /// Contact number for the zone, if staffed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    /// Set when a reported occupancy exceeded capacity and was clamped.
    #[serde(default)]
    pub over_capacity: bool,

    /// When the zone record was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl SafeZone {
    /// Creates an empty active zone. Mostly useful in tests and examples.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        zone_type: ZoneType,
        position: GeoPoint,
        capacity: u32,
    ) -> Self {
        Self {
            id: ZoneId::new(),
            name: name.into(),
            zone_type,
            position,
            capacity,
            current_occupancy: 0,
            facilities: BTreeSet::new(),
            is_active: true,
            contact: None,
            over_capacity: false,
            created_at: Utc::now(),
        }
    }

    /// Validates a decoded zone record.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.position.validate()?;
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "name" });
        }
        Ok(())
    }

    /// Enforces `current_occupancy <= capacity`.
    ///
    /// Returns true if the reported occupancy exceeded capacity; in that
    /// case occupancy is clamped to capacity and the record is flagged
    /// `over_capacity`. The update is still reflected rather than
    /// rejected, since occupancy is externally owned.
    pub fn clamp_occupancy(&mut self) -> bool {
        if self.current_occupancy > self.capacity {
            self.current_occupancy = self.capacity;
            self.over_capacity = true;
            true
        } else {
            self.over_capacity = false;
            false
        }
    }

    /// Free places left in the zone.
    #[must_use]
    pub const fn headroom(&self) -> u32 {
        self.capacity.saturating_sub(self.current_occupancy)
    }

    /// True when the zone may receive a new assignment.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        self.is_active && self.current_occupancy < self.capacity
    }
}
