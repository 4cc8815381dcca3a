//! The append-only activity log.
//!
//! Every state change a proposal goes through is recorded as an
//! [`ActivityEvent`]. Events are never updated or deleted; the pending
//! revision cycle is derived by replaying them (see [`crate::cycle`]).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  money::Brl,
  proposal::{BaseFields, CriticalFields},
  status::{ProposalStatus, StatusChangeSource},
};

/// The only entity type the engine currently logs against.
pub const PROPOSAL_ENTITY: &str = "proposal";

/// `trigger` recorded on a cycle opened through the engine.
pub const MANUAL_CYCLE_TRIGGER: &str = "manual_revision_cycle_start";

// ─── Payloads ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleOpened {
  pub cycle_id:                Uuid,
  /// The draft revision reserved for this cycle.
  pub revision_id:             Uuid,
  pub revision_number:         u32,
  pub copied_from_revision_id: Option<Uuid>,
  pub copied_suppliers_count:  u32,
  pub trigger:                 String,
  /// Critical fields as they were when the cycle opened.
  pub before:                  CriticalFields,
}

/// Only `cycle_id` is needed to end a cycle, so the other fields decode to
/// their defaults when missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleClosed {
  pub cycle_id:        Uuid,
  #[serde(default)]
  pub revision_id:     Uuid,
  #[serde(default)]
  pub revision_number: u32,
  #[serde(default)]
  pub reason:          String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleCanceled {
  pub cycle_id:        Uuid,
  #[serde(default)]
  pub revision_id:     Uuid,
  #[serde(default)]
  pub revision_number: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChanged {
  pub from:            ProposalStatus,
  pub to:              ProposalStatus,
  pub source:          StatusChangeSource,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub outcome_reason:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub final_value_brl: Option<Brl>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status_date:     Option<NaiveDate>,
}

impl StatusChanged {
  pub fn new(
    from: ProposalStatus,
    to: ProposalStatus,
    source: StatusChangeSource,
  ) -> Self {
    Self {
      from,
      to,
      source,
      outcome_reason: None,
      final_value_brl: None,
      status_date: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseUpdated {
  pub changed_fields:   Vec<String>,
  pub critical_changed: bool,
  pub before:           BaseFields,
  pub after:            BaseFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierLinkChange {
  pub link_id:             Uuid,
  pub supplier_id:         Uuid,
  pub supplier_legal_name: String,
  #[serde(default)]
  pub revision_id:         Option<Uuid>,
}

// ─── EventPayload ────────────────────────────────────────────────────────────

/// The typed payload of an activity event. The variant name is the `action`
/// column; the inner struct is the `metadata` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "metadata", rename_all = "snake_case")]
pub enum EventPayload {
  // ── Revision cycle ──────────────────────────────────────────────────────
  RevisionCycleOpened(CycleOpened),
  RevisionCycleClosed(CycleClosed),
  RevisionCycleCanceled(CycleCanceled),

  // ── Proposal ────────────────────────────────────────────────────────────
  StatusChanged(StatusChanged),
  ProposalBaseUpdated(BaseUpdated),

  // ── Suppliers ───────────────────────────────────────────────────────────
  SupplierLinked(SupplierLinkChange),
  SupplierUnlinked(SupplierLinkChange),
  SupplierLinkUpdated(SupplierLinkChange),
}

impl EventPayload {
  /// The string stored in the `action` column.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn action(&self) -> &'static str {
    match self {
      Self::RevisionCycleOpened(_) => "revision_cycle_opened",
      Self::RevisionCycleClosed(_) => "revision_cycle_closed",
      Self::RevisionCycleCanceled(_) => "revision_cycle_canceled",
      Self::StatusChanged(_) => "status_changed",
      Self::ProposalBaseUpdated(_) => "proposal_base_updated",
      Self::SupplierLinked(_) => "supplier_linked",
      Self::SupplierUnlinked(_) => "supplier_unlinked",
      Self::SupplierLinkUpdated(_) => "supplier_link_updated",
    }
  }

  /// Serialise the inner payload (without the action tag) for the
  /// `metadata_json` column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(
      full
        .get("metadata")
        .cloned()
        .unwrap_or(serde_json::Value::Null),
    )
  }

  /// Rebuild from the `action` and `metadata_json` columns.
  pub fn from_parts(action: &str, metadata: serde_json::Value) -> Result<Self> {
    let wrapped =
      serde_json::json!({ "action": action, "metadata": metadata });
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
  pub id:          Uuid,
  pub entity_type: String,
  pub entity_id:   Uuid,
  pub created_by:  Uuid,
  /// Server-assigned; never changes after creation.
  pub created_at:  DateTime<Utc>,
  #[serde(flatten)]
  pub payload:     EventPayload,
}

/// Input to [`crate::ports::ActivityLog::append`]. `id` and `created_at` are
/// set by the log.
#[derive(Debug, Clone)]
pub struct NewActivityEvent {
  pub entity_type: String,
  pub entity_id:   Uuid,
  pub created_by:  Uuid,
  pub payload:     EventPayload,
}

impl NewActivityEvent {
  pub fn for_proposal(
    proposal_id: Uuid,
    created_by: Uuid,
    payload: EventPayload,
  ) -> Self {
    Self {
      entity_type: PROPOSAL_ENTITY.to_owned(),
      entity_id: proposal_id,
      created_by,
      payload,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn metadata_is_camel_case_without_tag() {
    let payload = EventPayload::StatusChanged(StatusChanged {
      outcome_reason: Some("preço".into()),
      ..StatusChanged::new(
        ProposalStatus::Enviada,
        ProposalStatus::Perdida,
        StatusChangeSource::ManualStatusUpdate,
      )
    });
    assert_eq!(payload.action(), "status_changed");

    let json = payload.to_json().unwrap();
    assert_eq!(json["from"], "enviada");
    assert_eq!(json["to"], "perdida");
    assert_eq!(json["source"], "manual_status_update");
    assert_eq!(json["outcomeReason"], "preço");
    assert!(json.get("finalValueBrl").is_none());

    let back = EventPayload::from_parts("status_changed", json).unwrap();
    assert_eq!(back, payload);
  }

  #[test]
  fn opened_metadata_without_snapshot_does_not_decode() {
    let metadata = serde_json::json!({
      "cycleId": Uuid::new_v4(),
      "revisionId": Uuid::new_v4(),
      "revisionNumber": 1,
      "copiedFromRevisionId": null,
      "copiedSuppliersCount": 0,
      "trigger": MANUAL_CYCLE_TRIGGER,
    });
    assert!(EventPayload::from_parts("revision_cycle_opened", metadata).is_err());
  }

  #[test]
  fn unknown_action_does_not_decode() {
    let result = EventPayload::from_parts("mystery", serde_json::json!({}));
    assert!(result.is_err());
  }
}
