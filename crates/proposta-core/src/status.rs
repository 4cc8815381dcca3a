//! The proposal status state machine.
//!
//! Manual status changes go through [`check_status_update`]. Entering and
//! leaving `em_revisao` is owned by the revision-cycle protocol and never
//! passes through the manual path.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{error::Violation, money::Brl};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
  Recebida,
  EmElaboracao,
  Enviada,
  EmRevisao,
  Ganha,
  Perdida,
  Cancelada,
}

impl ProposalStatus {
  pub const ALL: [Self; 7] = [
    Self::Recebida,
    Self::EmElaboracao,
    Self::Enviada,
    Self::EmRevisao,
    Self::Ganha,
    Self::Perdida,
    Self::Cancelada,
  ];

  /// The string stored in the `status` column.
  /// Must match the `rename_all = "snake_case"` serde names above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Recebida => "recebida",
      Self::EmElaboracao => "em_elaboracao",
      Self::Enviada => "enviada",
      Self::EmRevisao => "em_revisao",
      Self::Ganha => "ganha",
      Self::Perdida => "perdida",
      Self::Cancelada => "cancelada",
    }
  }

  /// `ganha`, `perdida` and `cancelada` admit no further transitions.
  pub fn is_final(self) -> bool {
    matches!(self, Self::Ganha | Self::Perdida | Self::Cancelada)
  }

  /// Statuses from which a proposal may still be hard-deleted.
  pub fn is_deletable(self) -> bool {
    matches!(self, Self::Recebida | Self::EmElaboracao)
  }

  /// The allow-list of targets reachable from `self`.
  ///
  /// Includes the cycle-only edges (`enviada -> em_revisao` and
  /// `em_revisao -> enviada`); [`check_status_update`] rejects those for
  /// manual requests before consulting this table.
  pub fn allowed_targets(self) -> &'static [Self] {
    match self {
      Self::Recebida => &[Self::EmElaboracao, Self::Cancelada],
      Self::EmElaboracao => &[Self::Enviada, Self::Cancelada],
      Self::Enviada => {
        &[Self::EmRevisao, Self::Ganha, Self::Perdida, Self::Cancelada]
      }
      Self::EmRevisao => &[Self::Enviada],
      Self::Ganha | Self::Perdida | Self::Cancelada => &[],
    }
  }

  pub fn can_transition_to(self, to: Self) -> bool {
    self.allowed_targets().contains(&to)
  }

  /// Ensure `self -> to` is on the allow-list.
  pub fn ensure_transition(self, to: Self) -> Result<(), Violation> {
    if self.can_transition_to(to) {
      Ok(())
    } else {
      Err(Violation::InvalidTransition { from: self, to })
    }
  }
}

impl fmt::Display for ProposalStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ProposalStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| format!("unknown proposal status: {s:?}"))
  }
}

// ─── Change source ───────────────────────────────────────────────────────────

/// Which flow produced a `status_changed` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusChangeSource {
  ManualStatusUpdate,
  ManualSendWithFile,
  RevisionCycleOpen,
  RevisionCycleClose,
  RevisionCycleCancel,
}

// ─── Manual update ───────────────────────────────────────────────────────────

/// Input to a manual status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
  pub status:         ProposalStatus,
  #[serde(default)]
  pub outcome_reason: Option<String>,
  #[serde(default)]
  pub final_value:    Option<Brl>,
  #[serde(default)]
  pub status_date:    Option<NaiveDate>,
}

impl StatusUpdate {
  pub fn to(status: ProposalStatus) -> Self {
    Self {
      status,
      outcome_reason: None,
      final_value: None,
      status_date: None,
    }
  }

  pub fn with_outcome_reason(mut self, reason: impl Into<String>) -> Self {
    self.outcome_reason = Some(reason.into());
    self
  }
}

/// What a valid manual status request amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusDecision {
  /// The proposal is already in the requested status; nothing is written.
  Unchanged,
  /// Apply the change. `outcome_reason` is trimmed and non-blank.
  Apply {
    from:           ProposalStatus,
    to:             ProposalStatus,
    outcome_reason: Option<String>,
  },
}

/// Validate a manual status request against the current status.
///
/// Rules are checked in a fixed order so the first violated rule is the one
/// reported.
pub fn check_status_update(
  current: ProposalStatus,
  update: &StatusUpdate,
) -> Result<StatusDecision, Violation> {
  let to = update.status;

  if to == ProposalStatus::EmRevisao {
    return Err(Violation::RevisionStatusNotManual);
  }
  if current == ProposalStatus::EmRevisao {
    return Err(Violation::ProposalInRevision);
  }

  let outcome_reason = update
    .outcome_reason
    .as_deref()
    .map(str::trim)
    .filter(|reason| !reason.is_empty())
    .map(str::to_owned);

  match to {
    ProposalStatus::Perdida | ProposalStatus::Cancelada => {
      if outcome_reason.is_none() {
        return Err(Violation::OutcomeReasonRequired);
      }
    }
    ProposalStatus::Ganha => {}
    _ if outcome_reason.is_some() => {
      return Err(Violation::OutcomeReasonNotApplicable);
    }
    _ => {}
  }

  let takes_details =
    matches!(to, ProposalStatus::Enviada | ProposalStatus::Ganha);
  if !takes_details
    && (update.final_value.is_some() || update.status_date.is_some())
  {
    return Err(Violation::StatusDetailsNotApplicable);
  }

  if current == to {
    return Ok(StatusDecision::Unchanged);
  }

  current.ensure_transition(to)?;

  Ok(StatusDecision::Apply {
    from: current,
    to,
    outcome_reason,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use ProposalStatus::*;

  #[test]
  fn allow_list_matches_lifecycle() {
    assert!(Recebida.can_transition_to(EmElaboracao));
    assert!(Recebida.can_transition_to(Cancelada));
    assert!(!Recebida.can_transition_to(Enviada));
    assert!(EmElaboracao.can_transition_to(Enviada));
    assert!(Enviada.can_transition_to(EmRevisao));
    assert!(Enviada.can_transition_to(Ganha));
    assert!(EmRevisao.can_transition_to(Enviada));
    assert!(!EmRevisao.can_transition_to(Ganha));
    for terminal in [Ganha, Perdida, Cancelada] {
      assert!(terminal.is_final());
      for to in ProposalStatus::ALL {
        assert!(!terminal.can_transition_to(to));
      }
    }
  }

  #[test]
  fn status_strings_round_trip() {
    for status in ProposalStatus::ALL {
      assert_eq!(status.as_str().parse::<ProposalStatus>(), Ok(status));
      let json = serde_json::to_string(&status).unwrap();
      assert_eq!(json, format!("\"{}\"", status.as_str()));
    }
    assert!("unknown".parse::<ProposalStatus>().is_err());
  }

  #[test]
  fn em_revisao_is_never_a_manual_target() {
    let err = check_status_update(Enviada, &StatusUpdate::to(EmRevisao));
    assert_eq!(err, Err(Violation::RevisionStatusNotManual));
  }

  #[test]
  fn manual_change_while_in_revision_is_rejected() {
    let err = check_status_update(EmRevisao, &StatusUpdate::to(Enviada));
    assert_eq!(err, Err(Violation::ProposalInRevision));
  }

  #[test]
  fn lost_and_cancelled_require_a_reason() {
    for to in [Perdida, Cancelada] {
      assert_eq!(
        check_status_update(Enviada, &StatusUpdate::to(to)),
        Err(Violation::OutcomeReasonRequired)
      );
      assert_eq!(
        check_status_update(
          Enviada,
          &StatusUpdate::to(to).with_outcome_reason("   ")
        ),
        Err(Violation::OutcomeReasonRequired)
      );
    }

    let decision = check_status_update(
      Enviada,
      &StatusUpdate::to(Perdida).with_outcome_reason("  preço acima  "),
    );
    assert_eq!(
      decision,
      Ok(StatusDecision::Apply {
        from:           Enviada,
        to:             Perdida,
        outcome_reason: Some("preço acima".into()),
      })
    );
  }

  #[test]
  fn outcome_reason_rejected_on_non_final_target() {
    let update = StatusUpdate::to(Enviada).with_outcome_reason("why");
    assert_eq!(
      check_status_update(EmElaboracao, &update),
      Err(Violation::OutcomeReasonNotApplicable)
    );
  }

  #[test]
  fn details_only_for_sent_or_won() {
    let mut update = StatusUpdate::to(Cancelada).with_outcome_reason("x");
    update.final_value = Some(Brl::from_hundredths(100));
    assert_eq!(
      check_status_update(Enviada, &update),
      Err(Violation::StatusDetailsNotApplicable)
    );

    let mut won = StatusUpdate::to(Ganha);
    won.final_value = Some(Brl::from_hundredths(100));
    won.status_date = NaiveDate::from_ymd_opt(2026, 3, 1);
    assert!(matches!(
      check_status_update(Enviada, &won),
      Ok(StatusDecision::Apply { .. })
    ));
  }

  #[test]
  fn same_status_is_a_no_op() {
    assert_eq!(
      check_status_update(Enviada, &StatusUpdate::to(Enviada)),
      Ok(StatusDecision::Unchanged)
    );
  }

  #[test]
  fn leaving_a_final_status_is_invalid() {
    assert_eq!(
      check_status_update(Ganha, &StatusUpdate::to(Enviada)),
      Err(Violation::InvalidTransition {
        from: Ganha,
        to:   Enviada,
      })
    );
    assert_eq!(
      check_status_update(Recebida, &StatusUpdate::to(Ganha)),
      Err(Violation::InvalidTransition {
        from: Recebida,
        to:   Ganha,
      })
    );
  }
}
