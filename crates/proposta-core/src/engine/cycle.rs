//! The revision-cycle protocol: open, close, cancel.
//!
//! Opening reserves the next revision as a draft and copies the latest
//! revision's supplier links into it. Closing finalises that draft with the
//! cycle's document; cancelling deletes it and restores the critical fields
//! captured when the cycle opened.

use tracing::info;
use uuid::Uuid;

use super::Engine;
use crate::{
  Result,
  attachment::{AttachmentCategory, NewAttachment},
  cycle::{CloseCycle, PendingCycle, derive_discount, normalize_reason},
  document::{
    DocumentRequest, DocumentUploadTicket, StoragePath,
    validate_document_format, validate_document_name,
  },
  error::Violation,
  event::{
    CycleCanceled, CycleClosed, CycleOpened, EventPayload, MANUAL_CYCLE_TRIGGER,
    StatusChanged,
  },
  ports::{
    AttachmentRepository, ObjectStorage, ProposalRepository, Repositories,
    RevisionRepository, SupplierLinkRepository,
  },
  proposal::{
    BaseFields, NewRevision, Proposal, Revision, RevisionFinalization,
    StatusWrite,
  },
  service::{CycleCanceledOutcome, CycleClosedOutcome, CycleOpenedOutcome},
  status::{ProposalStatus, StatusChangeSource},
};

impl<R, O> Engine<'_, R, O>
where
  R: Repositories + ?Sized,
  O: ObjectStorage + ?Sized,
{
  pub fn open_cycle(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
  ) -> Result<CycleOpenedOutcome> {
    let proposal = self.load_proposal(proposal_id)?;
    if proposal.status != ProposalStatus::Enviada {
      return Err(Violation::CycleRequiresSent.into());
    }
    if self.pending_cycle(proposal_id)?.is_some() {
      return Err(Violation::CycleAlreadyPending.into());
    }
    proposal.status.ensure_transition(ProposalStatus::EmRevisao)?;

    let latest = RevisionRepository::find_many_by_proposal(self.repos, proposal_id)?
      .into_iter()
      .next()
      .ok_or(Violation::MissingBaseRevision)?;
    let revision_number =
      RevisionRepository::next_revision_number(self.repos, proposal_id)?;

    let revision = RevisionRepository::create(self.repos, NewRevision {
      proposal_id,
      revision_number,
      value_after: Some(proposal.estimated_value),
      created_by: actor,
    })?;
    let copied = SupplierLinkRepository::copy_revision_links(
      self.repos,
      proposal_id,
      latest.id,
      revision.id,
    )?;

    let revision_id = revision.id;
    let cycle_id = Uuid::new_v4();
    let snapshot = proposal.critical_fields();
    let opened = self.record(
      actor,
      proposal_id,
      EventPayload::RevisionCycleOpened(CycleOpened {
        cycle_id,
        revision_id,
        revision_number,
        copied_from_revision_id: Some(latest.id),
        copied_suppliers_count: copied,
        trigger: MANUAL_CYCLE_TRIGGER.to_owned(),
        before: snapshot.clone(),
      }),
    )?;

    let updated = self.move_status(
      actor,
      &proposal,
      ProposalStatus::EmRevisao,
      StatusChangeSource::RevisionCycleOpen,
    )?;

    info!(
      proposal = %proposal_id,
      %cycle_id,
      revision = revision_number,
      copied_suppliers = copied,
      "revision cycle opened"
    );

    Ok(CycleOpenedOutcome {
      proposal:      updated,
      revision,
      pending_cycle: PendingCycle {
        cycle_id,
        opened_at: opened.created_at,
        revision_id,
        revision_number,
        snapshot,
      },
    })
  }

  pub fn close_cycle(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    input: &CloseCycle,
  ) -> Result<CycleClosedOutcome> {
    let reason = normalize_reason(&input.reason)?;
    let document = &input.document;
    validate_document_format(&document.request())?;

    let (proposal, pending) = self.in_revision(proposal_id, "close")?;
    let ctx = self.load_storage_context(proposal_id)?;

    validate_document_name(
      &ctx.proposal_code,
      pending.revision_number,
      &document.file_name,
    )?;
    StoragePath::ensure_matches(
      &document.storage_path,
      &ctx,
      pending.revision_number,
      AttachmentCategory::PropostaWord,
    )?;
    if !self.objects.object_exists(&document.storage_path)? {
      return Err(Violation::DocumentNotUploaded.into());
    }

    let reserved = self.reserved_revision(&proposal, &pending)?;

    let value_before = Some(pending.snapshot.estimated_value);
    let value_after = Some(proposal.estimated_value);
    let (discount, discount_percent) = derive_discount(
      value_before,
      value_after,
      input.discount,
      input.discount_percent,
    );

    let revision = RevisionRepository::finalize(
      self.repos,
      reserved.id,
      &RevisionFinalization {
        reason: reason.clone(),
        scope_changes: input.scope_changes(),
        notes: input.notes(),
        value_before,
        value_after,
        discount,
        discount_percent,
      },
    )?;

    let attachment = AttachmentRepository::create(self.repos, NewAttachment {
      proposal_id,
      revision_id: Some(revision.id),
      category: AttachmentCategory::PropostaWord,
      file_name: document.file_name.clone(),
      storage_path: document.storage_path.clone(),
      mime_type: document.mime_type.clone(),
      size_bytes: document.size_bytes,
      uploaded_by: actor,
    })?;

    self.record(
      actor,
      proposal_id,
      EventPayload::RevisionCycleClosed(CycleClosed {
        cycle_id: pending.cycle_id,
        revision_id: revision.id,
        revision_number: revision.revision_number,
        reason,
      }),
    )?;
    let updated = self.move_status(
      actor,
      &proposal,
      ProposalStatus::Enviada,
      StatusChangeSource::RevisionCycleClose,
    )?;

    info!(
      proposal = %proposal_id,
      cycle_id = %pending.cycle_id,
      revision = revision.revision_number,
      "revision cycle closed"
    );

    Ok(CycleClosedOutcome {
      proposal: updated,
      revision,
      attachment,
    })
  }

  pub fn cancel_cycle(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
  ) -> Result<CycleCanceledOutcome> {
    let (proposal, pending) = self.in_revision(proposal_id, "cancel")?;
    let reserved = self.reserved_revision(&proposal, &pending)?;

    let storage_paths =
      AttachmentRepository::find_many_by_proposal(self.repos, proposal_id)?
        .into_iter()
        .filter(|attachment| attachment.revision_id == Some(reserved.id))
        .map(|attachment| attachment.storage_path)
        .collect();
    AttachmentRepository::delete_many_by_revision(self.repos, reserved.id)?;
    SupplierLinkRepository::delete_many_by_revision(self.repos, reserved.id)?;
    RevisionRepository::delete_by_id(self.repos, reserved.id)?;

    let restored = pending.snapshot.clone();
    let reverted = ProposalRepository::update_base_fields(
      self.repos,
      proposal_id,
      &BaseFields {
        project_name:      proposal.project_name.clone(),
        invitation_code:   proposal.invitation_code.clone(),
        scope_description: restored.scope_description.clone(),
        due_date:          restored.due_date,
        estimated_value:   restored.estimated_value,
      },
    )?;

    self.record(
      actor,
      proposal_id,
      EventPayload::RevisionCycleCanceled(CycleCanceled {
        cycle_id:        pending.cycle_id,
        revision_id:     reserved.id,
        revision_number: reserved.revision_number,
      }),
    )?;
    let updated = self.move_status(
      actor,
      &reverted,
      ProposalStatus::Enviada,
      StatusChangeSource::RevisionCycleCancel,
    )?;

    info!(
      proposal = %proposal_id,
      cycle_id = %pending.cycle_id,
      "revision cycle canceled"
    );

    Ok(CycleCanceledOutcome {
      proposal: updated,
      restored,
      storage_paths,
    })
  }

  pub fn prepare_revision_document_upload(
    &self,
    proposal_id: Uuid,
    document: &DocumentRequest,
  ) -> Result<DocumentUploadTicket> {
    validate_document_format(document)?;
    let (_, pending) =
      self.in_revision(proposal_id, "attach a document to")?;
    let ctx = self.load_storage_context(proposal_id)?;
    validate_document_name(
      &ctx.proposal_code,
      pending.revision_number,
      &document.file_name,
    )?;

    let path = StoragePath::new(
      &ctx,
      pending.revision_number,
      AttachmentCategory::PropostaWord,
      &document.file_name,
    );
    let upload = self.objects.create_signed_upload_url(&path.to_string())?;
    Ok(DocumentUploadTicket {
      upload,
      revision_number: pending.revision_number,
    })
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  /// Load a proposal that must be `em_revisao` with a pending cycle.
  fn in_revision(
    &self,
    proposal_id: Uuid,
    action: &'static str,
  ) -> Result<(Proposal, PendingCycle)> {
    let proposal = self.load_proposal(proposal_id)?;
    if proposal.status != ProposalStatus::EmRevisao {
      return Err(Violation::NotInRevision.into());
    }
    let pending = self
      .pending_cycle(proposal_id)?
      .ok_or(Violation::NoPendingCycle(action))?;
    Ok((proposal, pending))
  }

  /// The draft revision a pending cycle reserved.
  fn reserved_revision(
    &self,
    proposal: &Proposal,
    pending: &PendingCycle,
  ) -> Result<Revision> {
    RevisionRepository::find_by_id(self.repos, pending.revision_id)?
      .filter(|revision| revision.proposal_id == proposal.id)
      .ok_or_else(|| Violation::InvalidPendingRevision.into())
  }

  /// Write a protocol-driven status change and log it.
  pub(super) fn move_status(
    &self,
    actor: Uuid,
    proposal: &Proposal,
    to: ProposalStatus,
    source: StatusChangeSource,
  ) -> Result<Proposal> {
    proposal.status.ensure_transition(to)?;
    let updated = ProposalRepository::update_status(
      self.repos,
      proposal.id,
      &StatusWrite::status_only(proposal, to),
    )?;
    self.record(
      actor,
      proposal.id,
      EventPayload::StatusChanged(StatusChanged::new(
        proposal.status,
        to,
        source,
      )),
    )?;
    Ok(updated)
  }
}
