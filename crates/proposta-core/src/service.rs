//! The `ProposalService` trait and its result types.
//!
//! The trait is implemented by storage backends (e.g. `proposta-store-sqlite`)
//! by running each [`Engine`](crate::engine::Engine) operation atomically.
//! Interface layers depend on this abstraction, not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  attachment::{
    Attachment, AttachmentUploadRequest, DeletedAttachment, DownloadUrl,
    FinalizeAttachment,
  },
  cycle::{CloseCycle, PendingCycle},
  document::{DocumentRequest, DocumentUploadTicket, SendWithFile, SignedUpload},
  guard::BaseFieldsUpdate,
  history::ProposalDetail,
  proposal::{CriticalFields, NewProposal, Proposal, ProposalFilter, Revision},
  status::StatusUpdate,
  supplier::{LinkSupplier, SupplierLink, SupplierLinkValues},
};

// ─── Results ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleOpenedOutcome {
  pub proposal:      Proposal,
  /// The draft revision reserved for the cycle.
  pub revision:      Revision,
  pub pending_cycle: PendingCycle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleClosedOutcome {
  pub proposal:   Proposal,
  pub revision:   Revision,
  pub attachment: Attachment,
}

/// A canceled cycle. The objects at `storage_paths` belonged to the deleted
/// draft revision and are left for the caller to remove.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleCanceledOutcome {
  pub proposal:      Proposal,
  pub restored:      CriticalFields,
  pub storage_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentOutcome {
  pub proposal:   Proposal,
  pub attachment: Attachment,
}

/// A deleted proposal. The objects at `storage_paths` are left for the
/// caller to remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedProposal {
  pub proposal_id:   Uuid,
  pub storage_paths: Vec<String>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Every operation on proposals.
///
/// Each write runs as a single atomic unit: either all of its rows and
/// events are persisted or none are. `actor` is the already-authenticated
/// user performing the operation.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ProposalService: Send + Sync {
  // ── Proposals ─────────────────────────────────────────────────────────

  /// Create a proposal in `recebida` together with revision 0.
  fn create_proposal(
    &self,
    actor: Uuid,
    input: NewProposal,
  ) -> impl Future<Output = Result<Proposal>> + Send + '_;

  fn list_proposals(
    &self,
    filter: ProposalFilter,
  ) -> impl Future<Output = Result<Vec<Proposal>>> + Send + '_;

  fn proposal_detail(
    &self,
    proposal_id: Uuid,
  ) -> impl Future<Output = Result<ProposalDetail>> + Send + '_;

  /// Only `recebida` and `em_elaboracao` proposals can be deleted.
  fn delete_proposal(
    &self,
    proposal_id: Uuid,
  ) -> impl Future<Output = Result<DeletedProposal>> + Send + '_;

  /// A manual status change. Never enters or leaves `em_revisao`.
  fn update_status(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    update: StatusUpdate,
  ) -> impl Future<Output = Result<Proposal>> + Send + '_;

  fn update_base_fields(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    update: BaseFieldsUpdate,
  ) -> impl Future<Output = Result<Proposal>> + Send + '_;

  // ── Revision cycle ────────────────────────────────────────────────────

  fn open_cycle(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
  ) -> impl Future<Output = Result<CycleOpenedOutcome>> + Send + '_;

  fn close_cycle(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    input: CloseCycle,
  ) -> impl Future<Output = Result<CycleClosedOutcome>> + Send + '_;

  fn cancel_cycle(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
  ) -> impl Future<Output = Result<CycleCanceledOutcome>> + Send + '_;

  fn prepare_revision_document_upload(
    &self,
    proposal_id: Uuid,
    document: DocumentRequest,
  ) -> impl Future<Output = Result<DocumentUploadTicket>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  fn prepare_send_upload(
    &self,
    proposal_id: Uuid,
    document: DocumentRequest,
  ) -> impl Future<Output = Result<DocumentUploadTicket>> + Send + '_;

  fn send_with_file(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    input: SendWithFile,
  ) -> impl Future<Output = Result<SentOutcome>> + Send + '_;

  fn create_attachment_upload(
    &self,
    proposal_id: Uuid,
    request: AttachmentUploadRequest,
  ) -> impl Future<Output = Result<SignedUpload>> + Send + '_;

  fn finalize_attachment(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    input: FinalizeAttachment,
  ) -> impl Future<Output = Result<Attachment>> + Send + '_;

  fn delete_attachment(
    &self,
    attachment_id: Uuid,
  ) -> impl Future<Output = Result<DeletedAttachment>> + Send + '_;

  fn attachment_download_url(
    &self,
    attachment_id: Uuid,
  ) -> impl Future<Output = Result<DownloadUrl>> + Send + '_;

  // ── Suppliers ─────────────────────────────────────────────────────────

  fn link_supplier(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    input: LinkSupplier,
  ) -> impl Future<Output = Result<SupplierLink>> + Send + '_;

  fn update_supplier_link(
    &self,
    actor: Uuid,
    link_id: Uuid,
    values: SupplierLinkValues,
  ) -> impl Future<Output = Result<SupplierLink>> + Send + '_;

  /// Returns the removed link.
  fn unlink_supplier(
    &self,
    actor: Uuid,
    link_id: Uuid,
  ) -> impl Future<Output = Result<SupplierLink>> + Send + '_;
}
