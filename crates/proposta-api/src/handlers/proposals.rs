//! Handlers for `/proposals` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/proposals` | Optional `status`, `search`, `limit` |
//! | `POST`   | `/proposals` | Body: [`NewProposal`]; returns 201 |
//! | `GET`    | `/proposals/{id}` | Full [`ProposalDetail`] |
//! | `DELETE` | `/proposals/{id}` | Only before the proposal is sent |
//! | `POST`   | `/proposals/{id}/status` | Body: [`StatusUpdate`] |
//! | `PUT`    | `/proposals/{id}/base` | Body: [`BaseFieldsUpdate`] |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use proposta_core::{
  guard::BaseFieldsUpdate,
  history::ProposalDetail,
  proposal::{NewProposal, Proposal, ProposalFilter},
  service::{DeletedProposal, ProposalService},
  status::StatusUpdate,
};
use tracing::warn;
use uuid::Uuid;

use crate::{AppState, actor::Actor, error::ApiError};

// ─── List / create ───────────────────────────────────────────────────────────

/// `GET /proposals[?status=...][&search=...][&limit=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(filter): Query<ProposalFilter>,
) -> Result<Json<Vec<Proposal>>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  Ok(Json(state.service.list_proposals(filter).await?))
}

/// `POST /proposals`: returns 201 + the new proposal.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Json(body): Json<NewProposal>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  let proposal = state.service.create_proposal(actor, body).await?;
  Ok((StatusCode::CREATED, Json(proposal)))
}

// ─── Single proposal ─────────────────────────────────────────────────────────

pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ProposalDetail>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  Ok(Json(state.service.proposal_detail(id).await?))
}

/// `DELETE /proposals/{id}`: removes the rows, then the stored objects.
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Actor(_): Actor,
  Path(id): Path<Uuid>,
) -> Result<Json<DeletedProposal>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  let deleted = state.service.delete_proposal(id).await?;
  for path in &deleted.storage_paths {
    if let Err(e) = state.objects.remove(path).await {
      warn!(error = %e, path = %path, "failed to remove proposal object");
    }
  }
  Ok(Json(deleted))
}

pub async fn update_status<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusUpdate>,
) -> Result<Json<Proposal>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  Ok(Json(state.service.update_status(actor, id, body).await?))
}

pub async fn update_base<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<BaseFieldsUpdate>,
) -> Result<Json<Proposal>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  Ok(Json(state.service.update_base_fields(actor, id, body).await?))
}
