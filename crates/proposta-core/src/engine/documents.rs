//! Sending a proposal with its document, and supplementary attachments.

use tracing::info;
use uuid::Uuid;

use super::Engine;
use crate::{
  Error, Result,
  attachment::{
    Attachment, AttachmentCategory, AttachmentUploadRequest, DOWNLOAD_URL_TTL_SECONDS,
    DeletedAttachment, DownloadUrl, FinalizeAttachment, NewAttachment,
    validate_supplementary,
  },
  document::{
    DocumentRequest, DocumentUploadTicket, SendWithFile, SignedUpload,
    StoragePath, validate_document_format, validate_document_name,
  },
  error::{Entity, Violation},
  event::{EventPayload, StatusChanged},
  ports::{
    AttachmentRepository, ObjectStorage, ProposalRepository, Repositories,
    RevisionRepository,
  },
  proposal::{Proposal, Revision, StatusWrite},
  service::SentOutcome,
  status::{ProposalStatus, StatusChangeSource},
};

impl<R, O> Engine<'_, R, O>
where
  R: Repositories + ?Sized,
  O: ObjectStorage + ?Sized,
{
  pub fn prepare_send_upload(
    &self,
    proposal_id: Uuid,
    document: &DocumentRequest,
  ) -> Result<DocumentUploadTicket> {
    validate_document_format(document)?;
    let (_, latest) = self.sendable(proposal_id)?;
    let ctx = self.load_storage_context(proposal_id)?;
    validate_document_name(
      &ctx.proposal_code,
      latest.revision_number,
      &document.file_name,
    )?;

    let path = StoragePath::new(
      &ctx,
      latest.revision_number,
      AttachmentCategory::PropostaWord,
      &document.file_name,
    );
    let upload = self.objects.create_signed_upload_url(&path.to_string())?;
    Ok(DocumentUploadTicket {
      upload,
      revision_number: latest.revision_number,
    })
  }

  pub fn send_with_file(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    input: &SendWithFile,
  ) -> Result<SentOutcome> {
    let document = &input.document;
    validate_document_format(&document.request())?;
    let (proposal, latest) = self.sendable(proposal_id)?;
    let ctx = self.load_storage_context(proposal_id)?;

    validate_document_name(
      &ctx.proposal_code,
      latest.revision_number,
      &document.file_name,
    )?;
    StoragePath::ensure_matches(
      &document.storage_path,
      &ctx,
      latest.revision_number,
      AttachmentCategory::PropostaWord,
    )?;
    if !self.objects.object_exists(&document.storage_path)? {
      return Err(Violation::DocumentNotUploaded.into());
    }

    let attachment = AttachmentRepository::create(self.repos, NewAttachment {
      proposal_id,
      revision_id: Some(latest.id),
      category: AttachmentCategory::PropostaWord,
      file_name: document.file_name.clone(),
      storage_path: document.storage_path.clone(),
      mime_type: document.mime_type.clone(),
      size_bytes: document.size_bytes,
      uploaded_by: actor,
    })?;

    let updated = ProposalRepository::update_status(
      self.repos,
      proposal_id,
      &StatusWrite::status_only(&proposal, ProposalStatus::Enviada),
    )?;
    self.record(
      actor,
      proposal_id,
      EventPayload::StatusChanged(StatusChanged {
        status_date: input.status_date,
        ..StatusChanged::new(
          proposal.status,
          ProposalStatus::Enviada,
          StatusChangeSource::ManualSendWithFile,
        )
      }),
    )?;

    info!(
      proposal = %proposal_id,
      revision = latest.revision_number,
      "proposal sent with document"
    );

    Ok(SentOutcome {
      proposal: updated,
      attachment,
    })
  }

  // ── Supplementary attachments ─────────────────────────────────────────

  pub fn create_attachment_upload(
    &self,
    proposal_id: Uuid,
    request: &AttachmentUploadRequest,
  ) -> Result<SignedUpload> {
    validate_supplementary(
      request.category,
      &request.file_name,
      &request.mime_type,
      request.size_bytes,
    )?;
    let ctx = self.load_storage_context(proposal_id)?;
    let revision_number = match request.revision_id {
      Some(revision_id) => {
        self.owned_revision(proposal_id, revision_id)?.revision_number
      }
      None => 0,
    };

    let path = StoragePath::new(
      &ctx,
      revision_number,
      request.category,
      &request.file_name,
    );
    self.objects.create_signed_upload_url(&path.to_string())
  }

  pub fn finalize_attachment(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    input: &FinalizeAttachment,
  ) -> Result<Attachment> {
    validate_supplementary(
      input.category,
      &input.file_name,
      &input.mime_type,
      input.size_bytes,
    )?;
    let ctx = self.load_storage_context(proposal_id)?;
    let revision_number = match input.revision_id {
      Some(revision_id) => {
        self.owned_revision(proposal_id, revision_id)?.revision_number
      }
      None => 0,
    };
    StoragePath::ensure_matches(
      &input.storage_path,
      &ctx,
      revision_number,
      input.category,
    )?;
    if !self.objects.object_exists(&input.storage_path)? {
      return Err(Violation::DocumentNotUploaded.into());
    }

    AttachmentRepository::create(self.repos, NewAttachment {
      proposal_id,
      revision_id: input.revision_id,
      category: input.category,
      file_name: input.file_name.clone(),
      storage_path: input.storage_path.clone(),
      mime_type: input.mime_type.clone(),
      size_bytes: input.size_bytes,
      uploaded_by: actor,
    })
  }

  pub fn delete_attachment(&self, attachment_id: Uuid) -> Result<DeletedAttachment> {
    let attachment = self.load_attachment(attachment_id)?;
    if attachment.category.is_reserved() {
      return Err(Violation::ReservedCategory.into());
    }
    AttachmentRepository::delete_by_id(self.repos, attachment_id)?;
    Ok(DeletedAttachment {
      attachment_id,
      proposal_id: attachment.proposal_id,
      storage_path: attachment.storage_path,
    })
  }

  pub fn attachment_download_url(&self, attachment_id: Uuid) -> Result<DownloadUrl> {
    let attachment = self.load_attachment(attachment_id)?;
    let signed_url = self
      .objects
      .create_signed_download_url(&attachment.storage_path, DOWNLOAD_URL_TTL_SECONDS)?;
    Ok(DownloadUrl {
      signed_url,
      expires_in_seconds: DOWNLOAD_URL_TTL_SECONDS,
    })
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  /// A proposal that may move to `enviada` by sending its document, with the
  /// revision the document belongs to.
  fn sendable(&self, proposal_id: Uuid) -> Result<(Proposal, Revision)> {
    let proposal = self.load_proposal(proposal_id)?;
    if proposal.status == ProposalStatus::EmRevisao {
      return Err(Violation::SendDuringRevision.into());
    }
    proposal.status.ensure_transition(ProposalStatus::Enviada)?;
    let latest = RevisionRepository::find_many_by_proposal(self.repos, proposal_id)?
      .into_iter()
      .next()
      .ok_or(Violation::MissingRevision)?;
    Ok((proposal, latest))
  }

  fn owned_revision(&self, proposal_id: Uuid, revision_id: Uuid) -> Result<Revision> {
    let revision = RevisionRepository::find_by_id(self.repos, revision_id)?
      .ok_or(Error::NotFound(Entity::Revision, revision_id))?;
    if revision.proposal_id != proposal_id {
      return Err(Violation::ForeignRevision.into());
    }
    Ok(revision)
  }

  fn load_attachment(&self, attachment_id: Uuid) -> Result<Attachment> {
    AttachmentRepository::find_by_id(self.repos, attachment_id)?
      .ok_or(Error::NotFound(Entity::Attachment, attachment_id))
  }
}
