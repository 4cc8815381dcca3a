//! Error types for `proposta-core`.
//!
//! Every failure falls in one of three kinds (see [`ErrorKind`]): a missing
//! entity, a business-rule [`Violation`], or an unexpected failure of a
//! repository or storage call.

use thiserror::Error;
use uuid::Uuid;

use crate::status::ProposalStatus;

/// The kind of entity a [`Error::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
  Proposal,
  Revision,
  Customer,
  Supplier,
  SupplierLink,
  Attachment,
}

impl std::fmt::Display for Entity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      Self::Proposal => "proposal",
      Self::Revision => "revision",
      Self::Customer => "customer",
      Self::Supplier => "supplier",
      Self::SupplierLink => "supplier link",
      Self::Attachment => "attachment",
    })
  }
}

/// A business rule rejected the request. The message names the rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
  // ── Status machine ──────────────────────────────────────────────────────
  #[error("invalid status transition ({from} -> {to})")]
  InvalidTransition {
    from: ProposalStatus,
    to:   ProposalStatus,
  },

  #[error("status em_revisao can only be entered by opening a revision cycle")]
  RevisionStatusNotManual,

  #[error(
    "proposal is in revision; close or cancel the revision cycle instead"
  )]
  ProposalInRevision,

  #[error("an outcome reason is required for lost or cancelled proposals")]
  OutcomeReasonRequired,

  #[error("an outcome reason only applies to ganha, perdida or cancelada")]
  OutcomeReasonNotApplicable,

  #[error("final value and status date only apply to enviada or ganha")]
  StatusDetailsNotApplicable,

  // ── Revision cycle ──────────────────────────────────────────────────────
  #[error("a revision cycle can only be opened for sent proposals")]
  CycleRequiresSent,

  #[error("a revision cycle is already pending")]
  CycleAlreadyPending,

  #[error("proposal has no revision to start a cycle from")]
  MissingBaseRevision,

  #[error("proposal is not in revision")]
  NotInRevision,

  #[error("no pending revision cycle to {0}")]
  NoPendingCycle(&'static str),

  #[error("pending revision is invalid for this proposal")]
  InvalidPendingRevision,

  #[error("revision reason must have at least {min} characters")]
  ReasonTooShort { min: usize },

  // ── Base fields ─────────────────────────────────────────────────────────
  #[error("finalised proposals cannot have their base data changed")]
  ProposalFinalized,

  #[error(
    "to change scope, due date or estimated value, open a revision cycle \
     first"
  )]
  CriticalFieldOutsideRevision,

  #[error("{0} must not be blank")]
  BlankField(&'static str),

  #[error("{0} must not be negative")]
  NegativeAmount(&'static str),

  // ── Documents & attachments ─────────────────────────────────────────────
  #[error("proposal document must have a DOC, DOCX or PDF extension")]
  DocumentExtension,

  #[error("proposal document must be a DOC, DOCX or PDF file")]
  DocumentMimeType,

  #[error("file must be larger than 0 bytes and at most 50MB")]
  FileSize,

  #[error(
    "file name must contain the proposal code and revision token \
     R{revision_number}"
  )]
  DocumentName { revision_number: u32 },

  #[error("storage path does not belong to this proposal revision document")]
  StoragePathMismatch,

  #[error("uploaded file was not found in storage")]
  DocumentNotUploaded,

  #[error("proposta_word is reserved for the proposal send and revision flows")]
  ReservedCategory,

  #[error("unsupported file type")]
  UnsupportedFileType,

  #[error("an attachment is already registered at this storage path")]
  DuplicateStoragePath,

  #[error("proposal must not be in revision to send a document")]
  SendDuringRevision,

  #[error("proposal has no revision to attach the document to")]
  MissingRevision,

  #[error("revision does not belong to this proposal")]
  ForeignRevision,

  // ── Proposal creation / deletion ────────────────────────────────────────
  #[error("proposal year must be between 2000 and 2100")]
  InvalidYear,

  #[error("proposal sequence must be positive")]
  InvalidSequence,

  #[error("customer slug is invalid")]
  InvalidCustomerSlug,

  #[error("only received or in-preparation proposals can be deleted")]
  ProposalNotDeletable,

  // ── Supplier links ──────────────────────────────────────────────────────
  #[error(
    "suppliers can only be changed while the proposal is em_elaboracao or \
     em_revisao"
  )]
  SupplierEditNotAllowed,

  #[error("invalid revision for linking a supplier")]
  InvalidTargetRevision,

  #[error("supplier is already linked in this revision")]
  DuplicateSupplierLink,

  #[error("only the supplier links of the revision in progress can be changed")]
  RevisionNotInProgress,
}

/// Coarse classification used by outer layers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  Validation,
  Unexpected,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0} not found: {1}")]
  NotFound(Entity, Uuid),

  #[error(transparent)]
  Validation(#[from] Violation),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound(..) => ErrorKind::NotFound,
      Self::Validation(_) => ErrorKind::Validation,
      Self::Store(_) | Self::Serialization(_) => ErrorKind::Unexpected,
    }
  }

  /// The violated rule, if this is a validation error.
  pub fn violation(&self) -> Option<&Violation> {
    match self {
      Self::Validation(v) => Some(v),
      _ => None,
    }
  }

  /// Wrap a backend error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
