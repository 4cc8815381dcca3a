//! The critical-field edit guard.
//!
//! Scope, due date and estimated value are the commercial terms of a
//! proposal. Outside a revision cycle they are frozen; the other base fields
//! may be edited in any non-final status.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  error::Violation,
  money::Brl,
  proposal::{BaseFields, Proposal, non_blank},
  status::ProposalStatus,
};

/// Input to update the base fields of a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseFieldsUpdate {
  pub project_name:      String,
  #[serde(default)]
  pub invitation_code:   Option<String>,
  pub scope_description: String,
  #[serde(default)]
  pub due_date:          Option<NaiveDate>,
  pub estimated_value:   Brl,
}

impl BaseFieldsUpdate {
  /// Trim text fields and check blanks and signs.
  pub fn normalize(&self) -> Result<BaseFields, Violation> {
    let project_name = self.project_name.trim();
    if project_name.is_empty() {
      return Err(Violation::BlankField("project name"));
    }
    let scope_description = self.scope_description.trim();
    if scope_description.is_empty() {
      return Err(Violation::BlankField("scope description"));
    }
    if self.estimated_value.is_negative() {
      return Err(Violation::NegativeAmount("estimated value"));
    }
    Ok(BaseFields {
      project_name:      project_name.to_owned(),
      invitation_code:   non_blank(self.invitation_code.as_deref()),
      scope_description: scope_description.to_owned(),
      due_date:          self.due_date,
      estimated_value:   self.estimated_value,
    })
  }
}

/// Which base fields differ, by their event metadata name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseFieldsDiff {
  pub changed_fields:   Vec<&'static str>,
  pub critical_changed: bool,
}

impl BaseFieldsDiff {
  pub fn between(before: &BaseFields, after: &BaseFields) -> Self {
    let mut changed_fields = Vec::new();
    if before.project_name != after.project_name {
      changed_fields.push("projectName");
    }
    if before.invitation_code != after.invitation_code {
      changed_fields.push("invitationCode");
    }
    if before.scope_description != after.scope_description {
      changed_fields.push("scopeDescription");
    }
    if before.due_date != after.due_date {
      changed_fields.push("dueDate");
    }
    if before.estimated_value != after.estimated_value {
      changed_fields.push("estimatedValueBrl");
    }
    let critical_changed = before.critical() != after.critical();
    Self {
      changed_fields,
      critical_changed,
    }
  }
}

/// Decide whether `update` may be applied to `proposal`.
///
/// Returns the normalised fields and their diff against the current row.
pub fn check_base_update(
  proposal: &Proposal,
  update: &BaseFieldsUpdate,
) -> Result<(BaseFields, BaseFieldsDiff), Violation> {
  if proposal.status.is_final() {
    return Err(Violation::ProposalFinalized);
  }
  let next = update.normalize()?;
  let diff = BaseFieldsDiff::between(&proposal.base_fields(), &next);
  if diff.critical_changed && proposal.status != ProposalStatus::EmRevisao {
    return Err(Violation::CriticalFieldOutsideRevision);
  }
  Ok((next, diff))
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn proposal(status: ProposalStatus) -> Proposal {
    let now = Utc::now();
    Proposal {
      id: Uuid::new_v4(),
      customer_id: Uuid::new_v4(),
      code: "BV-EGIS-2026-BIM-001".into(),
      year: 2026,
      seq_number: 1,
      project_name: "Hospital".into(),
      scope_description: "Modelagem BIM".into(),
      invitation_code: None,
      due_date: NaiveDate::from_ymd_opt(2026, 6, 30),
      estimated_value: Brl::from_hundredths(100_000),
      final_value: None,
      outcome_reason: None,
      status,
      created_by: Uuid::nil(),
      created_at: now,
      updated_at: now,
    }
  }

  fn unchanged(p: &Proposal) -> BaseFieldsUpdate {
    BaseFieldsUpdate {
      project_name:      p.project_name.clone(),
      invitation_code:   p.invitation_code.clone(),
      scope_description: p.scope_description.clone(),
      due_date:          p.due_date,
      estimated_value:   p.estimated_value,
    }
  }

  #[test]
  fn non_critical_edit_allowed_in_every_non_final_status() {
    for status in ProposalStatus::ALL.into_iter().filter(|s| !s.is_final()) {
      let p = proposal(status);
      let mut update = unchanged(&p);
      update.project_name = "  Hospital Central ".into();
      update.invitation_code = Some("  CV-12 ".into());

      let (fields, diff) = check_base_update(&p, &update).unwrap();
      assert_eq!(fields.project_name, "Hospital Central");
      assert_eq!(fields.invitation_code.as_deref(), Some("CV-12"));
      assert_eq!(diff.changed_fields, ["projectName", "invitationCode"]);
      assert!(!diff.critical_changed);
    }
  }

  #[test]
  fn critical_edit_only_in_revision() {
    for status in ProposalStatus::ALL.into_iter().filter(|s| !s.is_final()) {
      let p = proposal(status);
      let mut update = unchanged(&p);
      update.estimated_value = Brl::from_hundredths(90_000);

      let result = check_base_update(&p, &update);
      if status == ProposalStatus::EmRevisao {
        let (_, diff) = result.unwrap();
        assert!(diff.critical_changed);
        assert_eq!(diff.changed_fields, ["estimatedValueBrl"]);
      } else {
        assert_eq!(result, Err(Violation::CriticalFieldOutsideRevision));
      }
    }
  }

  #[test]
  fn whitespace_only_scope_change_is_not_critical() {
    let p = proposal(ProposalStatus::Enviada);
    let mut update = unchanged(&p);
    update.scope_description = format!("  {}\n", p.scope_description);
    let (_, diff) = check_base_update(&p, &update).unwrap();
    assert!(diff.changed_fields.is_empty());
  }

  #[test]
  fn final_statuses_are_frozen() {
    for status in [
      ProposalStatus::Ganha,
      ProposalStatus::Perdida,
      ProposalStatus::Cancelada,
    ] {
      let p = proposal(status);
      assert_eq!(
        check_base_update(&p, &unchanged(&p)),
        Err(Violation::ProposalFinalized)
      );
    }
  }

  #[test]
  fn blank_and_negative_inputs_rejected() {
    let p = proposal(ProposalStatus::EmElaboracao);

    let mut blank = unchanged(&p);
    blank.project_name = "   ".into();
    assert_eq!(
      check_base_update(&p, &blank),
      Err(Violation::BlankField("project name"))
    );

    let mut negative = unchanged(&p);
    negative.estimated_value = Brl::from_hundredths(-1);
    assert_eq!(
      check_base_update(&p, &negative),
      Err(Violation::NegativeAmount("estimated value"))
    );
  }
}
