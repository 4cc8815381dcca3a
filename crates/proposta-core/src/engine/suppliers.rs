//! Linking suppliers to the revision currently open for edits.

use tracing::info;
use uuid::Uuid;

use super::Engine;
use crate::{
  Error, Result,
  error::{Entity, Violation},
  event::{EventPayload, SupplierLinkChange},
  ports::{ObjectStorage, Repositories, RevisionRepository, SupplierLinkRepository},
  proposal::Proposal,
  supplier::{
    LinkSupplier, LinkTarget, NewSupplierLink, SupplierLink, SupplierLinkValues,
    link_target,
  },
};

impl<R, O> Engine<'_, R, O>
where
  R: Repositories + ?Sized,
  O: ObjectStorage + ?Sized,
{
  pub fn link_supplier(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    input: &LinkSupplier,
  ) -> Result<SupplierLink> {
    let proposal = self.load_proposal(proposal_id)?;
    let supplier = SupplierLinkRepository::find_supplier(self.repos, input.supplier_id)?
      .ok_or(Error::NotFound(Entity::Supplier, input.supplier_id))?;
    let revision_id = self.editable_revision(&proposal)?;

    if SupplierLinkRepository::exists_link(
      self.repos,
      proposal_id,
      supplier.id,
      revision_id,
    )? {
      return Err(Violation::DuplicateSupplierLink.into());
    }

    let link = SupplierLinkRepository::create_link(self.repos, NewSupplierLink {
      proposal_id,
      revision_id,
      supplier_id: supplier.id,
      values: input.values.normalize(),
    })?;
    self.record(
      actor,
      proposal_id,
      EventPayload::SupplierLinked(link_change(&link)),
    )?;

    info!(
      proposal = %proposal_id,
      supplier = %supplier.id,
      revision = %revision_id,
      "supplier linked"
    );
    Ok(link)
  }

  pub fn update_supplier_link(
    &self,
    actor: Uuid,
    link_id: Uuid,
    values: &SupplierLinkValues,
  ) -> Result<SupplierLink> {
    let link = self.editable_link(link_id)?;
    let updated = SupplierLinkRepository::update_link_values(
      self.repos,
      link_id,
      &values.normalize(),
    )?;
    self.record(
      actor,
      link.proposal_id,
      EventPayload::SupplierLinkUpdated(link_change(&updated)),
    )?;
    Ok(updated)
  }

  pub fn unlink_supplier(&self, actor: Uuid, link_id: Uuid) -> Result<SupplierLink> {
    let link = self.editable_link(link_id)?;
    SupplierLinkRepository::delete_by_id(self.repos, link_id)?;
    self.record(
      actor,
      link.proposal_id,
      EventPayload::SupplierUnlinked(link_change(&link)),
    )?;

    info!(
      proposal = %link.proposal_id,
      supplier = %link.supplier_id,
      "supplier unlinked"
    );
    Ok(link)
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  /// The revision supplier edits currently apply to: revision 0 while the
  /// proposal is in preparation, the reserved revision during a cycle.
  fn editable_revision(&self, proposal: &Proposal) -> Result<Uuid> {
    let pending = self.pending_cycle(proposal.id)?;
    let revision = match link_target(proposal.status, pending.as_ref())? {
      LinkTarget::Initial => {
        RevisionRepository::find_many_by_proposal(self.repos, proposal.id)?
          .into_iter()
          .find(|revision| revision.revision_number == 0)
      }
      LinkTarget::Cycle(revision_id) => {
        RevisionRepository::find_by_id(self.repos, revision_id)?
          .filter(|revision| revision.proposal_id == proposal.id)
      }
    };
    revision
      .map(|revision| revision.id)
      .ok_or_else(|| Violation::InvalidTargetRevision.into())
  }

  /// A link that belongs to the revision currently open for edits.
  fn editable_link(&self, link_id: Uuid) -> Result<SupplierLink> {
    let link = SupplierLinkRepository::find_by_id(self.repos, link_id)?
      .ok_or(Error::NotFound(Entity::SupplierLink, link_id))?;
    let proposal = self.load_proposal(link.proposal_id)?;
    let revision_id = self.editable_revision(&proposal)?;
    if link.revision_id != Some(revision_id) {
      return Err(Violation::RevisionNotInProgress.into());
    }
    Ok(link)
  }
}

fn link_change(link: &SupplierLink) -> SupplierLinkChange {
  SupplierLinkChange {
    link_id:             link.id,
    supplier_id:         link.supplier_id,
    supplier_legal_name: link.supplier_legal_name.clone(),
    revision_id:         link.revision_id,
  }
}
