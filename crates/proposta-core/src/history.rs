//! Read-side projections: history, timeline and the proposal detail view.
//!
//! These are never stored; they are computed from revisions, attachments and
//! the activity log every time a proposal is read.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  attachment::{Attachment, AttachmentCategory},
  cycle::PendingCycle,
  event::{ActivityEvent, EventPayload},
  money::Brl,
  proposal::{Customer, Proposal, Revision},
  status::ProposalStatus,
  supplier::SupplierLink,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
  Status,
  Revision,
  Attachment,
  Supplier,
  Edition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub id:          String,
  pub kind:        HistoryKind,
  pub title:       String,
  pub description: String,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
  pub id:    String,
  pub title: String,
  pub date:  DateTime<Utc>,
}

/// Everything shown on a proposal's page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalDetail {
  pub proposal:       Proposal,
  pub customer:       Option<Customer>,
  pub current_value:  Brl,
  pub revisions:      Vec<Revision>,
  pub attachments:    Vec<Attachment>,
  pub supplier_links: Vec<SupplierLink>,
  pub activity:       Vec<ActivityEvent>,
  pub history:        Vec<HistoryEntry>,
  pub timeline:       Vec<TimelineEntry>,
  pub pending_cycle:  Option<PendingCycle>,
}

/// Calendar dates are placed at noon UTC so they never shift a day when
/// rendered in a Brazilian time zone.
fn at_noon(date: NaiveDate) -> DateTime<Utc> {
  date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()).and_utc()
}

/// Newest-first history of a proposal.
pub fn build_history(
  revisions: &[Revision],
  attachments: &[Attachment],
  activity: &[ActivityEvent],
) -> Vec<HistoryEntry> {
  let mut entries = Vec::new();

  for revision in revisions {
    entries.push(HistoryEntry {
      id:          format!("revision-{}", revision.id),
      kind:        HistoryKind::Revision,
      title:       format!("Revisão R{}", revision.revision_number),
      description: revision
        .reason
        .clone()
        .unwrap_or_else(|| "Revisão registrada".to_owned()),
      created_at:  revision.created_at,
    });
  }

  for attachment in attachments {
    entries.push(HistoryEntry {
      id:          format!("attachment-{}", attachment.id),
      kind:        HistoryKind::Attachment,
      title:       format!("Anexo enviado ({})", attachment.category),
      description: attachment.file_name.clone(),
      created_at:  attachment.created_at,
    });
  }

  for event in activity {
    let id = format!("activity-{}", event.id);
    let entry = match &event.payload {
      EventPayload::StatusChanged(change) => HistoryEntry {
        id,
        kind: HistoryKind::Status,
        title: "Status alterado".to_owned(),
        description: format!("{} -> {}", change.from, change.to),
        created_at: change.status_date.map(at_noon).unwrap_or(event.created_at),
      },
      EventPayload::ProposalBaseUpdated(_) => HistoryEntry {
        id,
        kind: HistoryKind::Edition,
        title: "Dados da proposta atualizados".to_owned(),
        description: "Campos comerciais da proposta foram alterados."
          .to_owned(),
        created_at: event.created_at,
      },
      EventPayload::SupplierLinked(link)
      | EventPayload::SupplierUnlinked(link)
      | EventPayload::SupplierLinkUpdated(link) => {
        let title = match event.payload {
          EventPayload::SupplierLinked(_) => "Fornecedor vinculado",
          EventPayload::SupplierUnlinked(_) => "Fornecedor desvinculado",
          _ => "Fornecedor atualizado",
        };
        HistoryEntry {
          id,
          kind: HistoryKind::Supplier,
          title: title.to_owned(),
          description: link.supplier_legal_name.clone(),
          created_at: event.created_at,
        }
      }
      EventPayload::RevisionCycleOpened(_)
      | EventPayload::RevisionCycleClosed(_)
      | EventPayload::RevisionCycleCanceled(_) => continue,
    };
    entries.push(entry);
  }

  entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
  entries
}

/// Oldest-first milestones of a proposal.
pub fn build_timeline(
  proposal: &Proposal,
  revisions: &[Revision],
  attachments: &[Attachment],
  activity: &[ActivityEvent],
) -> Vec<TimelineEntry> {
  let mut entries = vec![TimelineEntry {
    id:    "proposal-created".to_owned(),
    title: "Proposta criada".to_owned(),
    date:  proposal.created_at,
  }];

  if let Some(due) = proposal.due_date {
    entries.push(TimelineEntry {
      id:    "proposal-due-date".to_owned(),
      title: format!("Prazo definido para {due}"),
      date:  at_noon(due),
    });
  }

  for event in activity {
    match &event.payload {
      EventPayload::StatusChanged(change) => match change.to {
        ProposalStatus::EmRevisao => entries.push(TimelineEntry {
          id:    format!("status-in-review-{}", event.id),
          title: "Entrou em revisão".to_owned(),
          date:  event.created_at,
        }),
        ProposalStatus::Enviada | ProposalStatus::Ganha => {
          let title = if change.to == ProposalStatus::Enviada {
            "Proposta enviada"
          } else {
            "Proposta ganha"
          };
          entries.push(TimelineEntry {
            id:    format!("status-{}-{}", change.to, event.id),
            title: title.to_owned(),
            date:  change.status_date.map(at_noon).unwrap_or(event.created_at),
          });
        }
        _ => {}
      },
      EventPayload::RevisionCycleClosed(closed) => {
        entries.push(TimelineEntry {
          id:    format!("revision-close-{}", event.id),
          title: format!("Revisão R{} fechada", closed.revision_number),
          date:  event.created_at,
        });
      }
      _ => {}
    }
  }

  for revision in revisions {
    entries.push(TimelineEntry {
      id:    format!("revision-timeline-{}", revision.id),
      title: format!("Revisão R{} registrada", revision.revision_number),
      date:  revision.created_at,
    });
  }

  for attachment in attachments
    .iter()
    .filter(|a| a.category == AttachmentCategory::PropostaWord)
  {
    entries.push(TimelineEntry {
      id:    format!("attachment-proposal-word-{}", attachment.id),
      title: "Arquivo da proposta atualizado".to_owned(),
      date:  attachment.created_at,
    });
  }

  entries.push(TimelineEntry {
    id:    "proposal-status-now".to_owned(),
    title: format!("Status atual: {}", proposal.status),
    date:  proposal.updated_at,
  });

  entries.sort_by(|a, b| a.date.cmp(&b.date));
  entries
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};
  use uuid::Uuid;

  use super::*;
  use crate::{
    event::{CycleClosed, StatusChanged, SupplierLinkChange},
    status::StatusChangeSource,
  };

  fn t(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
      + Duration::minutes(minutes)
  }

  fn proposal() -> Proposal {
    Proposal {
      id: Uuid::new_v4(),
      customer_id: Uuid::new_v4(),
      code: "BV-EGIS-2026-BIM-001".into(),
      year: 2026,
      seq_number: 1,
      project_name: "Hospital".into(),
      scope_description: "BIM".into(),
      invitation_code: None,
      due_date: NaiveDate::from_ymd_opt(2026, 3, 10),
      estimated_value: Brl::from_hundredths(100_000),
      final_value: None,
      outcome_reason: None,
      status: ProposalStatus::Enviada,
      created_by: Uuid::nil(),
      created_at: t(0),
      updated_at: t(60),
    }
  }

  fn revision(number: u32, at: DateTime<Utc>) -> Revision {
    Revision {
      id: Uuid::new_v4(),
      proposal_id: Uuid::nil(),
      revision_number: number,
      reason: None,
      scope_changes: None,
      notes: None,
      value_before: None,
      value_after: None,
      discount: None,
      discount_percent: None,
      created_by: Uuid::nil(),
      created_at: at,
    }
  }

  fn event(at: DateTime<Utc>, payload: EventPayload) -> ActivityEvent {
    ActivityEvent {
      id: Uuid::new_v4(),
      entity_type: "proposal".into(),
      entity_id: Uuid::nil(),
      created_by: Uuid::nil(),
      created_at: at,
      payload,
    }
  }

  fn status(
    from: ProposalStatus,
    to: ProposalStatus,
    date: Option<NaiveDate>,
  ) -> EventPayload {
    EventPayload::StatusChanged(StatusChanged {
      status_date: date,
      ..StatusChanged::new(from, to, StatusChangeSource::ManualStatusUpdate)
    })
  }

  #[test]
  fn history_is_newest_first_with_titles() {
    let supplier = EventPayload::SupplierLinked(SupplierLinkChange {
      link_id:             Uuid::new_v4(),
      supplier_id:         Uuid::new_v4(),
      supplier_legal_name: "Acme Ltda".into(),
      revision_id:         None,
    });
    let activity = vec![
      event(t(30), supplier),
      event(
        t(20),
        status(ProposalStatus::Recebida, ProposalStatus::EmElaboracao, None),
      ),
    ];
    let history = build_history(&[revision(0, t(0))], &[], &activity);

    let titles: Vec<_> = history.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, ["Fornecedor vinculado", "Status alterado", "Revisão R0"]);
    assert_eq!(history[0].description, "Acme Ltda");
    assert_eq!(history[1].description, "recebida -> em_elaboracao");
    assert_eq!(history[2].description, "Revisão registrada");
  }

  #[test]
  fn status_date_overrides_event_time() {
    let date = NaiveDate::from_ymd_opt(2026, 2, 15).unwrap();
    let activity = vec![event(
      t(40),
      status(ProposalStatus::EmElaboracao, ProposalStatus::Enviada, Some(date)),
    )];
    let history = build_history(&[], &[], &activity);
    assert_eq!(
      history[0].created_at,
      Utc.with_ymd_and_hms(2026, 2, 15, 12, 0, 0).unwrap()
    );
  }

  #[test]
  fn timeline_is_oldest_first() {
    let p = proposal();
    let activity = vec![
      event(
        t(50),
        EventPayload::RevisionCycleClosed(CycleClosed {
          cycle_id:        Uuid::new_v4(),
          revision_id:     Uuid::new_v4(),
          revision_number: 1,
          reason:          "ajuste".into(),
        }),
      ),
      event(
        t(20),
        status(ProposalStatus::Enviada, ProposalStatus::EmRevisao, None),
      ),
      event(
        t(10),
        status(ProposalStatus::EmElaboracao, ProposalStatus::Enviada, None),
      ),
    ];
    let revisions = vec![revision(1, t(20)), revision(0, t(0))];
    let timeline = build_timeline(&p, &revisions, &[], &activity);

    let titles: Vec<_> = timeline.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(
      titles,
      [
        "Proposta criada",
        "Revisão R0 registrada",
        "Proposta enviada",
        "Entrou em revisão",
        "Revisão R1 registrada",
        "Revisão R1 fechada",
        "Status atual: enviada",
        "Prazo definido para 2026-03-10",
      ]
    );
  }
}
