//! Handlers for the revision cycle of a proposal.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/proposals/{id}/cycle` | Open; returns 201 |
//! | `POST` | `/proposals/{id}/cycle/document` | Body: [`DocumentRequest`]; signed upload for the cycle revision |
//! | `POST` | `/proposals/{id}/cycle/close` | Body: [`CloseCycle`] |
//! | `POST` | `/proposals/{id}/cycle/cancel` | Removes the draft revision's objects |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use proposta_core::{
  cycle::CloseCycle,
  document::{DocumentRequest, DocumentUploadTicket},
  service::{CycleCanceledOutcome, CycleClosedOutcome, ProposalService},
};
use tracing::warn;
use uuid::Uuid;

use crate::{AppState, actor::Actor, error::ApiError};

pub async fn open<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  let outcome = state.service.open_cycle(actor, id).await?;
  Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn document_upload<S>(
  State(state): State<AppState<S>>,
  Actor(_): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<DocumentRequest>,
) -> Result<Json<DocumentUploadTicket>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  let ticket = state
    .service
    .prepare_revision_document_upload(id, body)
    .await?;
  Ok(Json(ticket))
}

pub async fn close<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<CloseCycle>,
) -> Result<Json<CycleClosedOutcome>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  Ok(Json(state.service.close_cycle(actor, id, body).await?))
}

pub async fn cancel<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<CycleCanceledOutcome>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  let canceled = state.service.cancel_cycle(actor, id).await?;
  for path in &canceled.storage_paths {
    if let Err(e) = state.objects.remove(path).await {
      warn!(error = %e, path = %path, "failed to remove draft revision object");
    }
  }
  Ok(Json(canceled))
}
