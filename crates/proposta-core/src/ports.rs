//! Repository and storage ports used by the [`Engine`](crate::engine::Engine).
//!
//! Repositories are synchronous: a backend implements them over one open
//! transaction, so everything an engine operation reads and writes commits or
//! rolls back together. Repositories assign ids and timestamps.

use uuid::Uuid;

use crate::{
  Result,
  attachment::{Attachment, NewAttachment},
  document::SignedUpload,
  event::{ActivityEvent, NewActivityEvent},
  proposal::{
    BaseFields, Customer, NewRevision, Proposal, ProposalFilter,
    ProposalRecord, Revision, RevisionFinalization, StatusWrite,
    StorageContext,
  },
  supplier::{NewSupplierLink, Supplier, SupplierLink, SupplierLinkValues},
};

// ─── Proposals ───────────────────────────────────────────────────────────────

pub trait ProposalRepository {
  fn get_by_id(&self, id: Uuid) -> Result<Option<Proposal>>;

  /// The path components for the proposal's stored files.
  fn storage_context(&self, id: Uuid) -> Result<Option<StorageContext>>;

  fn find_customer(&self, id: Uuid) -> Result<Option<Customer>>;

  /// Reserve the next sequence number for `customer_id` in `year`.
  fn allocate_next_sequence(&self, customer_id: Uuid, year: i32) -> Result<u32>;

  /// Insert a proposal in status `recebida`.
  fn create(&self, record: ProposalRecord) -> Result<Proposal>;

  fn update_base_fields(&self, id: Uuid, fields: &BaseFields) -> Result<Proposal>;

  fn update_status(&self, id: Uuid, write: &StatusWrite) -> Result<Proposal>;

  /// Newest first.
  fn list(&self, filter: &ProposalFilter) -> Result<Vec<Proposal>>;

  /// Remove the proposal together with its revisions, links and attachment
  /// rows.
  fn delete_by_id(&self, id: Uuid) -> Result<()>;
}

// ─── Revisions ───────────────────────────────────────────────────────────────

pub trait RevisionRepository {
  /// `max(revision_number) + 1`, or 0 when the proposal has none.
  fn next_revision_number(&self, proposal_id: Uuid) -> Result<u32>;

  fn find_by_id(&self, id: Uuid) -> Result<Option<Revision>>;

  /// Highest revision number first.
  fn find_many_by_proposal(&self, proposal_id: Uuid) -> Result<Vec<Revision>>;

  fn create(&self, revision: NewRevision) -> Result<Revision>;

  /// Write the closing values onto a reserved revision.
  fn finalize(&self, id: Uuid, values: &RevisionFinalization) -> Result<Revision>;

  fn delete_by_id(&self, id: Uuid) -> Result<()>;
}

// ─── Activity log ────────────────────────────────────────────────────────────

/// Append-only. There is no update or delete.
pub trait ActivityLog {
  fn append(&self, event: NewActivityEvent) -> Result<ActivityEvent>;

  /// Newest first; ties keep reverse insertion order. Rows whose metadata
  /// does not decode are skipped.
  fn find_many_by_entity(
    &self,
    entity_type: &str,
    entity_id: Uuid,
  ) -> Result<Vec<ActivityEvent>>;
}

// ─── Suppliers ───────────────────────────────────────────────────────────────

pub trait SupplierLinkRepository {
  fn find_supplier(&self, id: Uuid) -> Result<Option<Supplier>>;

  fn find_by_id(&self, link_id: Uuid) -> Result<Option<SupplierLink>>;

  fn find_many_by_proposal(&self, proposal_id: Uuid)
  -> Result<Vec<SupplierLink>>;

  fn exists_link(
    &self,
    proposal_id: Uuid,
    supplier_id: Uuid,
    revision_id: Uuid,
  ) -> Result<bool>;

  fn create_link(&self, link: NewSupplierLink) -> Result<SupplierLink>;

  /// Copy every link of `source_revision` onto `target_revision`; returns
  /// how many were copied.
  fn copy_revision_links(
    &self,
    proposal_id: Uuid,
    source_revision: Uuid,
    target_revision: Uuid,
  ) -> Result<u32>;

  fn update_link_values(
    &self,
    link_id: Uuid,
    values: &SupplierLinkValues,
  ) -> Result<SupplierLink>;

  fn delete_by_id(&self, link_id: Uuid) -> Result<()>;

  fn delete_many_by_revision(&self, revision_id: Uuid) -> Result<()>;
}

// ─── Attachments ─────────────────────────────────────────────────────────────

pub trait AttachmentRepository {
  fn create(&self, attachment: NewAttachment) -> Result<Attachment>;

  fn find_by_id(&self, id: Uuid) -> Result<Option<Attachment>>;

  /// Newest first.
  fn find_many_by_proposal(&self, proposal_id: Uuid) -> Result<Vec<Attachment>>;

  fn delete_by_id(&self, id: Uuid) -> Result<()>;

  fn delete_many_by_revision(&self, revision_id: Uuid) -> Result<()>;
}

/// Everything an engine operation may touch in the database.
pub trait Repositories:
  ProposalRepository
  + RevisionRepository
  + ActivityLog
  + SupplierLinkRepository
  + AttachmentRepository
{
}

impl<T> Repositories for T where
  T: ProposalRepository
    + RevisionRepository
    + ActivityLog
    + SupplierLinkRepository
    + AttachmentRepository
{
}

// ─── Object storage ──────────────────────────────────────────────────────────

/// Where proposal files live. The engine only reads from it and asks for
/// signed URLs; uploads and deletes happen outside the engine.
pub trait ObjectStorage: Send + Sync {
  fn object_exists(&self, path: &str) -> Result<bool>;

  fn create_signed_upload_url(&self, path: &str) -> Result<SignedUpload>;

  fn create_signed_download_url(
    &self,
    path: &str,
    expires_in_seconds: u64,
  ) -> Result<String>;
}
