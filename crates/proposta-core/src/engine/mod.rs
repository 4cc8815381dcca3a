//! The engine runs every proposal operation against the [ports](crate::ports).
//!
//! An `Engine` borrows its repositories and object storage for the duration
//! of one operation. It is synchronous and holds no state of its own: a
//! backend builds one over an open transaction, calls a single method, and
//! commits if and only if the method returned `Ok`.
//!
//! The repository traits share method names (`create`, `find_by_id`, ...), so
//! calls are written with the trait path, e.g.
//! `RevisionRepository::find_by_id(self.repos, id)`.

mod cycle;
mod detail;
mod documents;
mod lifecycle;
mod suppliers;

use uuid::Uuid;

use crate::{
  Error, Result,
  cycle::{PendingCycle, find_pending_cycle},
  error::Entity,
  event::{ActivityEvent, EventPayload, NewActivityEvent, PROPOSAL_ENTITY},
  ports::{ActivityLog, ObjectStorage, ProposalRepository, Repositories},
  proposal::{Proposal, StorageContext},
};

pub struct Engine<'a, R: ?Sized, O: ?Sized> {
  repos:   &'a R,
  objects: &'a O,
}

impl<'a, R, O> Engine<'a, R, O>
where
  R: Repositories + ?Sized,
  O: ObjectStorage + ?Sized,
{
  pub fn new(repos: &'a R, objects: &'a O) -> Self { Self { repos, objects } }

  // ── Shared reads ──────────────────────────────────────────────────────

  fn load_proposal(&self, id: Uuid) -> Result<Proposal> {
    ProposalRepository::get_by_id(self.repos, id)?
      .ok_or(Error::NotFound(Entity::Proposal, id))
  }

  fn load_storage_context(&self, id: Uuid) -> Result<StorageContext> {
    ProposalRepository::storage_context(self.repos, id)?
      .ok_or(Error::NotFound(Entity::Proposal, id))
  }

  fn events(&self, proposal_id: Uuid) -> Result<Vec<ActivityEvent>> {
    ActivityLog::find_many_by_entity(self.repos, PROPOSAL_ENTITY, proposal_id)
  }

  fn pending_cycle(&self, proposal_id: Uuid) -> Result<Option<PendingCycle>> {
    Ok(find_pending_cycle(&self.events(proposal_id)?))
  }

  fn record(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    payload: EventPayload,
  ) -> Result<ActivityEvent> {
    ActivityLog::append(
      self.repos,
      NewActivityEvent::for_proposal(proposal_id, actor, payload),
    )
  }
}
