//! Suppliers and their revision-scoped links to proposals.
//!
//! A link always belongs to one revision. While a proposal is being prepared
//! links are made against revision 0; during a revision cycle only the links
//! of the cycle's reserved revision may change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  cycle::PendingCycle,
  error::Violation,
  money::{Brl, Hours},
  proposal::non_blank,
  status::ProposalStatus,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
  pub id:         Uuid,
  pub legal_name: String,
  pub specialty:  String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierLink {
  pub id:                  Uuid,
  pub proposal_id:         Uuid,
  pub revision_id:         Option<Uuid>,
  pub revision_number:     Option<u32>,
  pub supplier_id:         Uuid,
  pub supplier_legal_name: String,
  pub supplier_specialty:  String,
  pub role_description:    Option<String>,
  pub quoted_hourly_cost:  Option<Brl>,
  pub estimated_hours:     Option<Hours>,
  pub quoted_total:        Option<Brl>,
  pub created_at:          DateTime<Utc>,
}

/// The editable values of a link, as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierLinkValues {
  #[serde(default)]
  pub role_description:   Option<String>,
  #[serde(default)]
  pub quoted_hourly_cost: Option<Brl>,
  #[serde(default)]
  pub estimated_hours:    Option<Hours>,
  #[serde(default)]
  pub quoted_total:       Option<Brl>,
}

impl SupplierLinkValues {
  /// Trim the role and fill in the quoted total when it can be computed.
  pub fn normalize(&self) -> Self {
    Self {
      role_description:   non_blank(self.role_description.as_deref()),
      quoted_hourly_cost: self.quoted_hourly_cost,
      estimated_hours:    self.estimated_hours,
      quoted_total:       quoted_total(
        self.quoted_total,
        self.quoted_hourly_cost,
        self.estimated_hours,
      ),
    }
  }
}

/// An explicit total wins; otherwise `round(hourly × hours, 2)` when both are
/// known.
pub fn quoted_total(
  explicit: Option<Brl>,
  hourly: Option<Brl>,
  hours: Option<Hours>,
) -> Option<Brl> {
  explicit.or_else(|| match (hourly, hours) {
    (Some(hourly), Some(hours)) => hourly.times_hours(hours),
    _ => None,
  })
}

/// Input to link a supplier to a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSupplier {
  pub supplier_id: Uuid,
  #[serde(flatten)]
  pub values:      SupplierLinkValues,
}

/// Input to [`crate::ports::SupplierLinkRepository::create_link`].
#[derive(Debug, Clone)]
pub struct NewSupplierLink {
  pub proposal_id: Uuid,
  pub revision_id: Uuid,
  pub supplier_id: Uuid,
  pub values:      SupplierLinkValues,
}

/// Which revision supplier edits apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
  /// Revision 0, while the proposal is being prepared.
  Initial,
  /// The reserved revision of the pending cycle.
  Cycle(Uuid),
}

/// Decide which revision supplier edits apply to for a proposal in `status`.
pub fn link_target(
  status: ProposalStatus,
  pending: Option<&PendingCycle>,
) -> Result<LinkTarget, Violation> {
  match status {
    ProposalStatus::EmElaboracao => Ok(LinkTarget::Initial),
    ProposalStatus::EmRevisao => pending
      .map(|cycle| LinkTarget::Cycle(cycle.revision_id))
      .ok_or(Violation::InvalidTargetRevision),
    _ => Err(Violation::SupplierEditNotAllowed),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::proposal::CriticalFields;

  #[test]
  fn explicit_total_wins() {
    let total = quoted_total(
      Some(Brl::from_hundredths(500)),
      Some(Brl::from_hundredths(10_000)),
      Some(Hours::from_hundredths(1_000)),
    );
    assert_eq!(total, Some(Brl::from_hundredths(500)));
  }

  #[test]
  fn total_computed_from_hourly_and_hours() {
    let total = quoted_total(
      None,
      Some(Brl::from_hundredths(15_055)),
      Some(Hours::from_hundredths(1_250)),
    );
    assert_eq!(total, Some(Brl::from_hundredths(188_188)));
    assert_eq!(quoted_total(None, Some(Brl::from_hundredths(1)), None), None);
  }

  #[test]
  fn role_is_trimmed() {
    let values = SupplierLinkValues {
      role_description: Some("   ".into()),
      ..Default::default()
    };
    assert_eq!(values.normalize().role_description, None);
  }

  #[test]
  fn target_depends_on_status() {
    assert_eq!(
      link_target(ProposalStatus::EmElaboracao, None),
      Ok(LinkTarget::Initial)
    );
    assert_eq!(
      link_target(ProposalStatus::Enviada, None),
      Err(Violation::SupplierEditNotAllowed)
    );
    assert_eq!(
      link_target(ProposalStatus::EmRevisao, None),
      Err(Violation::InvalidTargetRevision)
    );

    let cycle = PendingCycle {
      cycle_id:        Uuid::new_v4(),
      opened_at:       Utc::now(),
      revision_id:     Uuid::new_v4(),
      revision_number: 2,
      snapshot:        CriticalFields {
        scope_description: "s".into(),
        due_date:          None,
        estimated_value:   Brl::ZERO,
      },
    };
    assert_eq!(
      link_target(ProposalStatus::EmRevisao, Some(&cycle)),
      Ok(LinkTarget::Cycle(cycle.revision_id))
    );
  }
}
