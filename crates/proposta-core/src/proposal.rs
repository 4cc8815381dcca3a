//! Proposals, revisions and customers.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

use crate::{
  error::Violation,
  money::{Brl, Percent},
  status::ProposalStatus,
};

// ─── Text normalisation ──────────────────────────────────────────────────────

/// NFD-decompose and drop combining marks (`"Égís"` → `"Egis"`).
pub fn strip_diacritics(value: &str) -> String {
  value.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Trim, mapping a blank string to `None`.
pub fn non_blank(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

// ─── Customer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
  pub id:         Uuid,
  pub name:       String,
  pub slug:       String,
  pub created_at: DateTime<Utc>,
}

/// Build a URL-safe lower-case slug from a customer name
/// (`"Égis Engenharia"` → `"egis-engenharia"`).
pub fn customer_slug(name: &str) -> Result<String, Violation> {
  let mut slug = String::new();
  for c in strip_diacritics(name).chars() {
    if c.is_ascii_alphanumeric() {
      slug.push(c.to_ascii_lowercase());
    } else if !slug.is_empty() && !slug.ends_with('-') {
      slug.push('-');
    }
  }
  while slug.ends_with('-') {
    slug.pop();
  }
  if slug.is_empty() {
    return Err(Violation::InvalidCustomerSlug);
  }
  Ok(slug)
}

// ─── Proposal code ───────────────────────────────────────────────────────────

/// Strip diacritics and non-alphanumerics and upper-case
/// (`"Égís Engenharia"` → `"EGISENGENHARIA"`).
pub fn code_segment(slug: &str) -> String {
  strip_diacritics(slug)
    .chars()
    .filter(char::is_ascii_alphanumeric)
    .map(|c| c.to_ascii_uppercase())
    .collect()
}

/// `BV-{SLUG}-{year}-BIM-{seq:03}`.
pub fn proposal_code(
  customer_slug: &str,
  year: i32,
  sequence: u32,
) -> Result<String, Violation> {
  if !(2000..=2100).contains(&year) {
    return Err(Violation::InvalidYear);
  }
  if sequence == 0 {
    return Err(Violation::InvalidSequence);
  }
  let segment = code_segment(customer_slug);
  if segment.is_empty() {
    return Err(Violation::InvalidCustomerSlug);
  }
  Ok(format!("BV-{segment}-{year}-BIM-{sequence:03}"))
}

// ─── Field groups ────────────────────────────────────────────────────────────

/// The fields that change the commercial terms of a sent proposal. Also the
/// snapshot a revision cycle captures and restores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalFields {
  pub scope_description: String,
  pub due_date:          Option<NaiveDate>,
  #[serde(rename = "estimatedValueBrl")]
  pub estimated_value:   Brl,
}

/// All editable proposal fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseFields {
  pub project_name:      String,
  pub invitation_code:   Option<String>,
  pub scope_description: String,
  pub due_date:          Option<NaiveDate>,
  #[serde(rename = "estimatedValueBrl")]
  pub estimated_value:   Brl,
}

impl BaseFields {
  pub fn critical(&self) -> CriticalFields {
    CriticalFields {
      scope_description: self.scope_description.clone(),
      due_date:          self.due_date,
      estimated_value:   self.estimated_value,
    }
  }
}

// ─── Proposal ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
  pub id:                Uuid,
  pub customer_id:       Uuid,
  /// `BV-{SLUG}-{year}-BIM-{seq}`; unique and never changed.
  pub code:              String,
  pub year:              i32,
  pub seq_number:        u32,
  pub project_name:      String,
  pub scope_description: String,
  pub invitation_code:   Option<String>,
  pub due_date:          Option<NaiveDate>,
  pub estimated_value:   Brl,
  pub final_value:       Option<Brl>,
  pub outcome_reason:    Option<String>,
  pub status:            ProposalStatus,
  pub created_by:        Uuid,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

impl Proposal {
  pub fn base_fields(&self) -> BaseFields {
    BaseFields {
      project_name:      self.project_name.clone(),
      invitation_code:   self.invitation_code.clone(),
      scope_description: self.scope_description.clone(),
      due_date:          self.due_date,
      estimated_value:   self.estimated_value,
    }
  }

  pub fn critical_fields(&self) -> CriticalFields {
    CriticalFields {
      scope_description: self.scope_description.clone(),
      due_date:          self.due_date,
      estimated_value:   self.estimated_value,
    }
  }
}

/// The path components needed to place a proposal's files in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageContext {
  pub proposal_id:   Uuid,
  pub proposal_code: String,
  pub year:          i32,
  pub customer_slug: String,
}

/// Input to create a proposal. Code and sequence are assigned by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProposal {
  pub customer_id:       Uuid,
  pub year:              i32,
  pub project_name:      String,
  pub scope_description: String,
  #[serde(default)]
  pub invitation_code:   Option<String>,
  #[serde(default)]
  pub due_date:          Option<NaiveDate>,
  pub estimated_value:   Brl,
}

/// A fully-resolved proposal row ready for insertion.
#[derive(Debug, Clone)]
pub struct ProposalRecord {
  pub customer_id: Uuid,
  pub code:        String,
  pub year:        i32,
  pub seq_number:  u32,
  pub fields:      BaseFields,
  pub created_by:  Uuid,
}

/// Parameters for listing proposals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalFilter {
  pub status: Option<ProposalStatus>,
  /// Case-insensitive substring over code and project name.
  pub search: Option<String>,
  pub limit:  Option<usize>,
}

/// The columns written by a realised status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWrite {
  pub status:         ProposalStatus,
  pub outcome_reason: Option<String>,
  pub final_value:    Option<Brl>,
}

impl StatusWrite {
  /// Change only the status, keeping outcome and final value as they are.
  pub fn status_only(proposal: &Proposal, status: ProposalStatus) -> Self {
    Self {
      status,
      outcome_reason: proposal.outcome_reason.clone(),
      final_value: proposal.final_value,
    }
  }
}

// ─── Revision ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
  pub id:               Uuid,
  pub proposal_id:      Uuid,
  pub revision_number:  u32,
  /// `None` for revision 0 and for a cycle's reserved draft.
  pub reason:           Option<String>,
  pub scope_changes:    Option<String>,
  pub notes:            Option<String>,
  pub value_before:     Option<Brl>,
  pub value_after:      Option<Brl>,
  pub discount:         Option<Brl>,
  pub discount_percent: Option<Percent>,
  pub created_by:       Uuid,
  pub created_at:       DateTime<Utc>,
}

/// Input to [`crate::ports::RevisionRepository::create`].
#[derive(Debug, Clone)]
pub struct NewRevision {
  pub proposal_id:     Uuid,
  pub revision_number: u32,
  pub value_after:     Option<Brl>,
  pub created_by:      Uuid,
}

/// The values written onto a reserved revision when its cycle closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionFinalization {
  pub reason:           String,
  pub scope_changes:    Option<String>,
  pub notes:            Option<String>,
  pub value_before:     Option<Brl>,
  pub value_after:      Option<Brl>,
  pub discount:         Option<Brl>,
  pub discount_percent: Option<Percent>,
}

/// The value a proposal is currently worth: the latest revision's
/// `value_after`, else the final value, else the estimate.
pub fn current_value(proposal: &Proposal, revisions: &[Revision]) -> Brl {
  revisions
    .iter()
    .max_by_key(|r| r.revision_number)
    .and_then(|r| r.value_after)
    .or(proposal.final_value)
    .unwrap_or(proposal.estimated_value)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn code_segment_strips_accents_and_symbols() {
    assert_eq!(code_segment("Égís Engenharia"), "EGISENGENHARIA");
    assert_eq!(code_segment("egis-engenharia"), "EGISENGENHARIA");
  }

  #[test]
  fn builds_proposal_code() {
    assert_eq!(proposal_code("EGIS", 2026, 45).unwrap(), "BV-EGIS-2026-BIM-045");
    assert_eq!(proposal_code("egis", 2026, 1).unwrap(), "BV-EGIS-2026-BIM-001");
    assert_eq!(
      proposal_code("egis", 2026, 1234).unwrap(),
      "BV-EGIS-2026-BIM-1234"
    );
  }

  #[test]
  fn rejects_bad_code_inputs() {
    assert_eq!(proposal_code("egis", 1999, 1), Err(Violation::InvalidYear));
    assert_eq!(proposal_code("egis", 2101, 1), Err(Violation::InvalidYear));
    assert_eq!(proposal_code("egis", 2026, 0), Err(Violation::InvalidSequence));
    assert_eq!(proposal_code("--", 2026, 1), Err(Violation::InvalidCustomerSlug));
  }

  #[test]
  fn customer_slug_is_dashed_lowercase() {
    assert_eq!(customer_slug("  Égis   Engenharia! ").unwrap(), "egis-engenharia");
    assert_eq!(customer_slug("???"), Err(Violation::InvalidCustomerSlug));
  }

  #[test]
  fn critical_fields_use_camel_case_keys() {
    let fields = CriticalFields {
      scope_description: "BIM".into(),
      due_date:          NaiveDate::from_ymd_opt(2026, 5, 10),
      estimated_value:   Brl::from_hundredths(100_000),
    };
    let json = serde_json::to_value(&fields).unwrap();
    assert_eq!(json["scopeDescription"], "BIM");
    assert_eq!(json["dueDate"], "2026-05-10");
    assert_eq!(json["estimatedValueBrl"], 1000.0);
  }
}
