//! Distress ("SOS") request records and origination input.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::geo::GeoPoint;

/// Stable identifier of a distress request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a request ID from an existing UUID.
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

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed set of emergency categories an operator can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyType {
    /// Medical emergency.
    Medical,
    /// Trapped or stuck.
    Trapped,
    /// Injured.
    Injured,
    /// Fire.
    Fire,
    /// Flood.
    Flood,
    /// Anything else.
    Other,
}

impl fmt::Display for EmergencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Medical => "Medical",
            Self::Trapped => "Trapped",
            Self::Injured => "Injured",
            Self::Fire => "Fire",
            Self::Flood => "Flood",
            Self::Other => "Other",
        };
        f.write_str(s)
    }
}

/// Lifecycle status of a distress request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Awaiting triage and shelter assignment.
    #[default]
    Pending,
    /// A responder or shelter has taken the request.
    Assigned,
    /// The request has been resolved.
    Resolved,
}

/// Triage priority. Every new request starts at `Critical` and is only
/// downgraded by an external triage authority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestPriority {
    /// Highest priority.
    #[default]
    Critical,
    /// Elevated priority.
    High,
    /// Routine priority.
    Normal,
}

impl RequestPriority {
    /// Sort rank, most urgent first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Normal => 2,
        }
    }
}

/// A distress request as reconciled into the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistressRequest {
    /// Stable key for reconciliation.
    pub id: RequestId,

    /// Name of the person requesting help.
    pub requester: String,

    /// How to reach the requester (phone number or similar).
    pub contact: String,

    /// Where help is needed.
    pub position: GeoPoint,

    /// Reported emergency category.
    pub emergency: EmergencyType,

    /// Number of people at the position. At least 1.
    pub people_count: u32,

    /// Lifecycle status.
    #[serde(default)]
    pub status: RequestStatus,

    /// Triage priority.
    #[serde(default)]
    pub priority: RequestPriority,

    /// Free-form situation details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// When the request was created.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// When the request was resolved, if it has been.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl DistressRequest {
    /// Validates a decoded request record.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.position.validate()?;

        if self.people_count == 0 {
            return Err(ValidationError::OutOfRange {
                field: "people_count",
                value: 0.0,
            });
        }
        if self.requester.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "requester" });
        }
        if self.contact.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "contact" });
        }

        Ok(())
    }

    /// Returns true if the request still awaits assignment.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// Operator input for originating a new distress request.
///
/// The core turns this into a provisional [`DistressRequest`] with
/// `status = Pending` and `priority = Critical`; the authoritative Insert
/// event for the same id later supersedes the provisional record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistressCall {
    /// Name of the person requesting help.
    pub requester: String,
    /// How to reach the requester.
    pub contact: String,
    /// Reported emergency category.
    pub emergency: EmergencyType,
    /// Number of people at the position. At least 1.
    pub people_count: u32,
    /// Captured position of the caller.
    pub position: GeoPoint,
    /// Free-form situation details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DistressCall {
    /// Builds the provisional request record for this call.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when the call is incomplete or out of
    /// range; an invalid call never reaches the store.
    pub fn into_request(self) -> Result<DistressRequest, ValidationError> {
        let request = DistressRequest {
            id: RequestId::new(),
            requester: self.requester,
            contact: self.contact,
            position: self.position,
            emergency: self.emergency,
            people_count: self.people_count,
            status: RequestStatus::Pending,
            priority: RequestPriority::Critical,
            description: self.description,
            created_at: Utc::now(),
            resolved_at: None,
        };
        request.validate()?;
        Ok(request)
    }
}
