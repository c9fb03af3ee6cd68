//! Change events delivered by the external notification transport.
//!
//! Delivery is at-least-once and unordered across entity kinds. Within one
//! kind+id, events carry a monotonically increasing sequence number; the
//! stores use it for last-writer-wins reconciliation. The payload is an
//! opaque JSON document until the reconciler decodes it for its kind.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Sequence number used for provisional records originated locally.
///
/// Authoritative events start at 1, so any authoritative upsert or delete
/// for the same id supersedes a provisional record.
pub const PROVISIONAL_SEQ: u64 = 0;

/// The three entity collections the core reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Hazard alerts.
    Alert,
    /// Distress requests.
    Request,
    /// Safe zones.
    Zone,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Alert => "alert",
            Self::Request => "request",
            Self::Zone => "zone",
        };
        f.write_str(s)
    }
}

/// The change carried by an event.
///
/// Insert and Update are both full-record upserts: a later Update fully
/// supersedes an earlier one for the same id, never a partial-field merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A new record.
    Insert,
    /// A full replacement of an existing record.
    Update,
    /// Removal of a record.
    Delete,
}

impl ChangeKind {
    /// Returns true for the two upsert shapes.
    #[must_use]
    pub const fn is_upsert(self) -> bool {
        matches!(self, Self::Insert | Self::Update)
    }
}

/// One change notification from the external transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Which collection this event belongs to.
    pub kind: EntityKind,

    /// Insert, Update, or Delete.
    pub change: ChangeKind,

    /// Per-(kind, id) monotonic sequence number assigned by the source.
    pub sequence: u64,

    /// The full record (upserts) or at least `{ "id": ... }` (deletes).
    pub payload: serde_json::Value,
}

impl ChangeEvent {
    /// Convenience constructor for an upsert event.
    #[must_use]
    pub const fn upsert(kind: EntityKind, sequence: u64, payload: serde_json::Value) -> Self {
        Self {
            kind,
            change: ChangeKind::Update,
            sequence,
            payload,
        }
    }

    /// Convenience constructor for a delete event.
    #[must_use]
    pub fn delete(kind: EntityKind, sequence: u64, id: Uuid) -> Self {
        Self {
            kind,
            change: ChangeKind::Delete,
            sequence,
            payload: serde_json::json!({ "id": id }),
        }
    }

    /// Extracts the target id of a delete payload.
    pub fn delete_target(&self) -> Result<Uuid, ValidationError> {
        #[derive(Deserialize)]
        struct Target {
            id: Uuid,
        }

        let target: Target =
            serde_json::from_value(self.payload.clone()).map_err(|e| {
                ValidationError::MalformedPayload {
                    kind: self.kind,
                    reason: e.to_string(),
                }
            })?;
        Ok(target.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_target_reads_the_id() {
        let id = Uuid::new_v4();
        let event = ChangeEvent::delete(EntityKind::Alert, 7, id);
        assert_eq!(event.delete_target().unwrap(), id);
    }

    #[test]
    fn delete_target_rejects_missing_id() {
        let event = ChangeEvent {
            kind: EntityKind::Zone,
            change: ChangeKind::Delete,
            sequence: 1,
            payload: serde_json::json!({ "name": "no id here" }),
        };
        assert!(matches!(
            event.delete_target(),
            Err(ValidationError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn change_kind_classification() {
        assert!(ChangeKind::Insert.is_upsert());
        assert!(ChangeKind::Update.is_upsert());
        assert!(!ChangeKind::Delete.is_upsert());
    }

    #[test]
    fn event_serde_round_trip() {
        let event = ChangeEvent::upsert(
            EntityKind::Request,
            42,
            serde_json::json!({ "id": Uuid::new_v4() }),
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: ChangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
