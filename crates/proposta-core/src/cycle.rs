//! Revision cycles, derived from the activity log.
//!
//! A cycle is opened by a `revision_cycle_opened` event and ends with a
//! `revision_cycle_closed` or `revision_cycle_canceled` event carrying the
//! same `cycle_id`. No cycle state is stored anywhere else.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  document::DocumentUpload,
  error::Violation,
  event::{ActivityEvent, EventPayload},
  money::{Brl, Percent},
  proposal::{CriticalFields, non_blank},
};

/// Minimum length, in characters, of a trimmed revision reason.
pub const MIN_REASON_CHARS: usize = 3;

/// An opened cycle with no matching close or cancel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCycle {
  pub cycle_id:        Uuid,
  pub opened_at:       DateTime<Utc>,
  /// The draft revision reserved when the cycle opened.
  pub revision_id:     Uuid,
  pub revision_number: u32,
  pub snapshot:        CriticalFields,
}

/// Find the pending cycle in a newest-first event list.
///
/// The newest opened event whose `cycle_id` has not been closed or canceled
/// wins.
pub fn find_pending_cycle(events: &[ActivityEvent]) -> Option<PendingCycle> {
  let ended: HashSet<Uuid> = events
    .iter()
    .filter_map(|event| match &event.payload {
      EventPayload::RevisionCycleClosed(closed) => Some(closed.cycle_id),
      EventPayload::RevisionCycleCanceled(canceled) => Some(canceled.cycle_id),
      _ => None,
    })
    .collect();

  events.iter().find_map(|event| match &event.payload {
    EventPayload::RevisionCycleOpened(opened)
      if !ended.contains(&opened.cycle_id) =>
    {
      Some(PendingCycle {
        cycle_id:        opened.cycle_id,
        opened_at:       event.created_at,
        revision_id:     opened.revision_id,
        revision_number: opened.revision_number,
        snapshot:        opened.before.clone(),
      })
    }
    _ => None,
  })
}

/// Trim a revision reason and enforce its minimum length.
pub fn normalize_reason(reason: &str) -> Result<String, Violation> {
  let trimmed = reason.trim();
  if trimmed.chars().count() < MIN_REASON_CHARS {
    return Err(Violation::ReasonTooShort {
      min: MIN_REASON_CHARS,
    });
  }
  Ok(trimmed.to_owned())
}

/// Discount recorded on a closed revision.
///
/// Explicit values are kept as given. When neither is supplied and the value
/// went down, the discount is `before - after` and the percentage is taken
/// over `before`.
pub fn derive_discount(
  before: Option<Brl>,
  after: Option<Brl>,
  discount: Option<Brl>,
  discount_percent: Option<Percent>,
) -> (Option<Brl>, Option<Percent>) {
  if discount.is_some() || discount_percent.is_some() {
    return (discount, discount_percent);
  }
  match (before, after) {
    (Some(before), Some(after)) if after < before => {
      let amount = before.checked_sub(after);
      let percent = amount.and_then(|a| Percent::of_ratio(a, before));
      (amount, percent)
    }
    _ => (None, None),
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to close the pending cycle of a proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseCycle {
  pub reason:           String,
  #[serde(default)]
  pub scope_changes:    Option<String>,
  #[serde(default)]
  pub notes:            Option<String>,
  #[serde(default)]
  pub discount:         Option<Brl>,
  #[serde(default)]
  pub discount_percent: Option<Percent>,
  /// The revision document, already uploaded to storage.
  pub document:         DocumentUpload,
}

impl CloseCycle {
  pub fn scope_changes(&self) -> Option<String> {
    non_blank(self.scope_changes.as_deref())
  }

  pub fn notes(&self) -> Option<String> { non_blank(self.notes.as_deref()) }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use proptest::prelude::*;

  use super::*;
  use crate::event::{
    CycleCanceled, CycleClosed, CycleOpened, MANUAL_CYCLE_TRIGGER,
    PROPOSAL_ENTITY,
  };

  fn snapshot(cents: i64) -> CriticalFields {
    CriticalFields {
      scope_description: "escopo".into(),
      due_date:          None,
      estimated_value:   Brl::from_hundredths(cents),
    }
  }

  fn event(seq: i64, payload: EventPayload) -> ActivityEvent {
    ActivityEvent {
      id: Uuid::new_v4(),
      entity_type: PROPOSAL_ENTITY.into(),
      entity_id: Uuid::nil(),
      created_by: Uuid::nil(),
      created_at: Utc.timestamp_opt(1_700_000_000 + seq, 0).unwrap(),
      payload,
    }
  }

  fn opened(cycle_id: Uuid, number: u32) -> EventPayload {
    EventPayload::RevisionCycleOpened(CycleOpened {
      cycle_id,
      revision_id: Uuid::from_u128(u128::from(number)),
      revision_number: number,
      copied_from_revision_id: None,
      copied_suppliers_count: 0,
      trigger: MANUAL_CYCLE_TRIGGER.into(),
      before: snapshot(i64::from(number) * 100),
    })
  }

  fn closed(cycle_id: Uuid) -> EventPayload {
    EventPayload::RevisionCycleClosed(CycleClosed {
      cycle_id,
      revision_id: Uuid::nil(),
      revision_number: 0,
      reason: "ok!".into(),
    })
  }

  fn canceled(cycle_id: Uuid) -> EventPayload {
    EventPayload::RevisionCycleCanceled(CycleCanceled {
      cycle_id,
      revision_id: Uuid::nil(),
      revision_number: 0,
    })
  }

  /// Build a newest-first log from payloads in chronological order.
  fn log(payloads: Vec<EventPayload>) -> Vec<ActivityEvent> {
    let mut events: Vec<_> = payloads
      .into_iter()
      .enumerate()
      .map(|(i, p)| event(i as i64, p))
      .collect();
    events.reverse();
    events
  }

  #[test]
  fn empty_log_has_no_pending_cycle() {
    assert_eq!(find_pending_cycle(&[]), None);
  }

  #[test]
  fn open_cycle_is_pending_with_snapshot() {
    let id = Uuid::new_v4();
    let pending = find_pending_cycle(&log(vec![opened(id, 1)])).unwrap();
    assert_eq!(pending.cycle_id, id);
    assert_eq!(pending.revision_number, 1);
    assert_eq!(pending.snapshot, snapshot(100));
  }

  #[test]
  fn closed_or_canceled_cycle_is_not_pending() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let events = log(vec![opened(a, 1), closed(a), opened(b, 2), canceled(b)]);
    assert_eq!(find_pending_cycle(&events), None);
  }

  #[test]
  fn sparse_end_events_still_end_the_cycle() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let sparse_close = EventPayload::from_parts(
      "revision_cycle_closed",
      serde_json::json!({ "cycleId": a }),
    )
    .unwrap();
    let sparse_cancel = EventPayload::from_parts(
      "revision_cycle_canceled",
      serde_json::json!({ "cycleId": b }),
    )
    .unwrap();
    let events = log(vec![opened(a, 1), sparse_close, opened(b, 2), sparse_cancel]);
    assert_eq!(find_pending_cycle(&events), None);
  }

  #[test]
  fn newest_open_cycle_wins() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let events = log(vec![opened(a, 1), closed(a), opened(b, 2)]);
    assert_eq!(find_pending_cycle(&events).unwrap().cycle_id, b);
  }

  #[test]
  fn reason_is_trimmed_and_counted_in_chars() {
    assert_eq!(normalize_reason("  ajuste  ").unwrap(), "ajuste");
    assert_eq!(normalize_reason("ção").unwrap(), "ção");
    assert_eq!(
      normalize_reason("  ab "),
      Err(Violation::ReasonTooShort { min: 3 })
    );
  }

  #[test]
  fn discount_derived_when_value_drops() {
    let before = Some(Brl::from_hundredths(100_000));
    let after = Some(Brl::from_hundredths(90_000));
    assert_eq!(
      derive_discount(before, after, None, None),
      (
        Some(Brl::from_hundredths(10_000)),
        Some(Percent::from_hundredths(1_000))
      )
    );
  }

  #[test]
  fn discount_not_derived_when_value_rises_or_explicit() {
    let before = Some(Brl::from_hundredths(100_000));
    let after = Some(Brl::from_hundredths(120_000));
    assert_eq!(derive_discount(before, after, None, None), (None, None));

    let lower = Some(Brl::from_hundredths(50_000));
    let explicit = Some(Percent::from_hundredths(500));
    assert_eq!(derive_discount(before, lower, None, explicit), (None, explicit));
  }

  // ── Properties ────────────────────────────────────────────────────────

  #[derive(Debug, Clone)]
  enum Step {
    Open,
    Close,
    Cancel,
  }

  fn step() -> impl Strategy<Value = Step> {
    prop_oneof![Just(Step::Open), Just(Step::Close), Just(Step::Cancel)]
  }

  proptest! {
    /// Driving the log through the protocol, the fold always reports exactly
    /// the cycle the protocol considers open.
    #[test]
    fn fold_agrees_with_protocol(steps in prop::collection::vec(step(), 0..40)) {
      let mut payloads = Vec::new();
      let mut open: Option<Uuid> = None;
      let mut number = 0u32;

      for step in steps {
        match (step, open) {
          (Step::Open, None) => {
            number += 1;
            let id = Uuid::new_v4();
            payloads.push(opened(id, number));
            open = Some(id);
          }
          (Step::Close, Some(id)) => {
            payloads.push(closed(id));
            open = None;
          }
          (Step::Cancel, Some(id)) => {
            payloads.push(canceled(id));
            open = None;
          }
          // Rejected by the protocol; nothing is logged.
          _ => {}
        }

        let pending = find_pending_cycle(&log(payloads.clone()));
        prop_assert_eq!(pending.map(|p| p.cycle_id), open);
      }
    }

    /// Over arbitrary logs, the fold returns the newest opened cycle that
    /// has not ended.
    #[test]
    fn fold_matches_reference_model(
      ops in prop::collection::vec((0u8..3, 0usize..4), 0..30)
    ) {
      let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
      let payloads: Vec<EventPayload> = ops
        .iter()
        .map(|(kind, idx)| match kind {
          0 => opened(ids[*idx], 1),
          1 => closed(ids[*idx]),
          _ => canceled(ids[*idx]),
        })
        .collect();

      let ended: HashSet<Uuid> = ops
        .iter()
        .filter(|(kind, _)| *kind != 0)
        .map(|(_, idx)| ids[*idx])
        .collect();
      let expected = ops
        .iter()
        .rev()
        .filter(|(kind, idx)| *kind == 0 && !ended.contains(&ids[*idx]))
        .map(|(_, idx)| ids[*idx])
        .next();

      let pending = find_pending_cycle(&log(payloads));
      prop_assert_eq!(pending.map(|p| p.cycle_id), expected);
    }
  }
}
