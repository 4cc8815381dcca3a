//! Creating, listing and deleting proposals; manual status and base-field
//! changes.

use tracing::info;
use uuid::Uuid;

use super::Engine;
use crate::{
  Error, Result,
  error::{Entity, Violation},
  event::{BaseUpdated, EventPayload, StatusChanged},
  guard::{BaseFieldsUpdate, check_base_update},
  ports::{
    AttachmentRepository, ObjectStorage, ProposalRepository, Repositories,
    RevisionRepository,
  },
  proposal::{
    NewProposal, NewRevision, Proposal, ProposalFilter, ProposalRecord,
    StatusWrite, proposal_code,
  },
  service::DeletedProposal,
  status::{StatusChangeSource, StatusDecision, StatusUpdate, check_status_update},
};

impl<R, O> Engine<'_, R, O>
where
  R: Repositories + ?Sized,
  O: ObjectStorage + ?Sized,
{
  pub fn create_proposal(&self, actor: Uuid, input: NewProposal) -> Result<Proposal> {
    let customer = ProposalRepository::find_customer(self.repos, input.customer_id)?
      .ok_or(Error::NotFound(Entity::Customer, input.customer_id))?;

    let fields = BaseFieldsUpdate {
      project_name:      input.project_name,
      invitation_code:   input.invitation_code,
      scope_description: input.scope_description,
      due_date:          input.due_date,
      estimated_value:   input.estimated_value,
    }
    .normalize()?;

    let seq_number =
      ProposalRepository::allocate_next_sequence(self.repos, customer.id, input.year)?;
    let code = proposal_code(&customer.slug, input.year, seq_number)?;
    let estimated_value = fields.estimated_value;

    let proposal = ProposalRepository::create(self.repos, ProposalRecord {
      customer_id: customer.id,
      code,
      year: input.year,
      seq_number,
      fields,
      created_by: actor,
    })?;

    RevisionRepository::create(self.repos, NewRevision {
      proposal_id:     proposal.id,
      revision_number: 0,
      value_after:     Some(estimated_value),
      created_by:      actor,
    })?;

    info!(proposal = %proposal.id, code = %proposal.code, "proposal created");
    Ok(proposal)
  }

  pub fn list_proposals(&self, filter: &ProposalFilter) -> Result<Vec<Proposal>> {
    ProposalRepository::list(self.repos, filter)
  }

  pub fn delete_proposal(&self, proposal_id: Uuid) -> Result<DeletedProposal> {
    let proposal = self.load_proposal(proposal_id)?;
    if !proposal.status.is_deletable() {
      return Err(Violation::ProposalNotDeletable.into());
    }

    let storage_paths =
      AttachmentRepository::find_many_by_proposal(self.repos, proposal_id)?
        .into_iter()
        .map(|attachment| attachment.storage_path)
        .collect();
    ProposalRepository::delete_by_id(self.repos, proposal_id)?;

    info!(proposal = %proposal_id, "proposal deleted");
    Ok(DeletedProposal {
      proposal_id,
      storage_paths,
    })
  }

  pub fn update_status(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    update: &StatusUpdate,
  ) -> Result<Proposal> {
    let proposal = self.load_proposal(proposal_id)?;

    let StatusDecision::Apply {
      from,
      to,
      outcome_reason,
    } = check_status_update(proposal.status, update)?
    else {
      return Ok(proposal);
    };

    let updated = ProposalRepository::update_status(self.repos, proposal_id, &StatusWrite {
      status:         to,
      outcome_reason: outcome_reason.clone(),
      final_value:    update.final_value.or(proposal.final_value),
    })?;

    self.record(
      actor,
      proposal_id,
      EventPayload::StatusChanged(StatusChanged {
        outcome_reason,
        final_value_brl: update.final_value,
        status_date: update.status_date,
        ..StatusChanged::new(from, to, StatusChangeSource::ManualStatusUpdate)
      }),
    )?;

    info!(proposal = %proposal_id, %from, %to, "proposal status changed");
    Ok(updated)
  }

  pub fn update_base_fields(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    update: &BaseFieldsUpdate,
  ) -> Result<Proposal> {
    let proposal = self.load_proposal(proposal_id)?;
    let (fields, diff) = check_base_update(&proposal, update)?;

    let updated =
      ProposalRepository::update_base_fields(self.repos, proposal_id, &fields)?;

    self.record(
      actor,
      proposal_id,
      EventPayload::ProposalBaseUpdated(BaseUpdated {
        changed_fields:   diff.changed_fields.iter().map(|f| f.to_string()).collect(),
        critical_changed: diff.critical_changed,
        before:           proposal.base_fields(),
        after:            updated.base_fields(),
      }),
    )?;

    Ok(updated)
  }
}
