use uuid::Uuid;

use super::Engine;
use crate::{
  Result,
  cycle::find_pending_cycle,
  history::{ProposalDetail, build_history, build_timeline},
  ports::{
    AttachmentRepository, ObjectStorage, ProposalRepository, Repositories,
    RevisionRepository, SupplierLinkRepository,
  },
  proposal::current_value,
};

impl<R, O> Engine<'_, R, O>
where
  R: Repositories + ?Sized,
  O: ObjectStorage + ?Sized,
{
  pub fn proposal_detail(&self, proposal_id: Uuid) -> Result<ProposalDetail> {
    let proposal = self.load_proposal(proposal_id)?;
    let customer = ProposalRepository::find_customer(self.repos, proposal.customer_id)?;
    let revisions = RevisionRepository::find_many_by_proposal(self.repos, proposal_id)?;
    let attachments =
      AttachmentRepository::find_many_by_proposal(self.repos, proposal_id)?;
    let supplier_links =
      SupplierLinkRepository::find_many_by_proposal(self.repos, proposal_id)?;
    let activity = self.events(proposal_id)?;

    let pending_cycle = find_pending_cycle(&activity);
    let history = build_history(&revisions, &attachments, &activity);
    let timeline = build_timeline(&proposal, &revisions, &attachments, &activity);

    Ok(ProposalDetail {
      current_value: current_value(&proposal, &revisions),
      proposal,
      customer,
      revisions,
      attachments,
      supplier_links,
      activity,
      history,
      timeline,
      pending_cycle,
    })
  }
}
