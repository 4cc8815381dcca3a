//! Handlers for proposal documents and supplementary attachments.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/proposals/{id}/send/document` | Body: [`DocumentRequest`]; signed upload for the latest revision |
//! | `POST`   | `/proposals/{id}/send` | Body: [`SendWithFile`] |
//! | `POST`   | `/proposals/{id}/attachments/upload` | Body: [`AttachmentUploadRequest`] |
//! | `POST`   | `/proposals/{id}/attachments` | Body: [`FinalizeAttachment`]; returns 201 |
//! | `DELETE` | `/attachments/{id}` | Removes the row, then the object |
//! | `GET`    | `/attachments/{id}/download` | Signed download URL |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use proposta_core::{
  attachment::{
    AttachmentUploadRequest, DeletedAttachment, DownloadUrl, FinalizeAttachment,
  },
  document::{DocumentRequest, DocumentUploadTicket, SendWithFile, SignedUpload},
  service::{ProposalService, SentOutcome},
};
use tracing::warn;
use uuid::Uuid;

use crate::{AppState, actor::Actor, error::ApiError};

// ─── Send ────────────────────────────────────────────────────────────────────

pub async fn send_upload<S>(
  State(state): State<AppState<S>>,
  Actor(_): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<DocumentRequest>,
) -> Result<Json<DocumentUploadTicket>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  Ok(Json(state.service.prepare_send_upload(id, body).await?))
}

pub async fn send<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<SendWithFile>,
) -> Result<Json<SentOutcome>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  Ok(Json(state.service.send_with_file(actor, id, body).await?))
}

// ─── Attachments ─────────────────────────────────────────────────────────────

pub async fn attachment_upload<S>(
  State(state): State<AppState<S>>,
  Actor(_): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<AttachmentUploadRequest>,
) -> Result<Json<SignedUpload>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  Ok(Json(state.service.create_attachment_upload(id, body).await?))
}

pub async fn finalize_attachment<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<FinalizeAttachment>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  let attachment = state.service.finalize_attachment(actor, id, body).await?;
  Ok((StatusCode::CREATED, Json(attachment)))
}

pub async fn delete_attachment<S>(
  State(state): State<AppState<S>>,
  Actor(_): Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<DeletedAttachment>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  let deleted = state.service.delete_attachment(id).await?;
  if let Err(e) = state.objects.remove(&deleted.storage_path).await {
    warn!(
      error = %e,
      path = %deleted.storage_path,
      "failed to remove object of deleted attachment"
    );
  }
  Ok(Json(deleted))
}

pub async fn download_url<S>(
  State(state): State<AppState<S>>,
  Actor(_): Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<DownloadUrl>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  Ok(Json(state.service.attachment_download_url(id).await?))
}
