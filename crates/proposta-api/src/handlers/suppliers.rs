//! Handlers for supplier links.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/proposals/{id}/suppliers` | Body: [`LinkSupplier`]; returns 201 |
//! | `PUT`    | `/supplier-links/{id}` | Body: [`SupplierLinkValues`] |
//! | `DELETE` | `/supplier-links/{id}` | Returns the removed link |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use proposta_core::{
  service::ProposalService,
  supplier::{LinkSupplier, SupplierLink, SupplierLinkValues},
};
use uuid::Uuid;

use crate::{AppState, actor::Actor, error::ApiError};

pub async fn link<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(id): Path<Uuid>,
  Json(body): Json<LinkSupplier>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  let link = state.service.link_supplier(actor, id, body).await?;
  Ok((StatusCode::CREATED, Json(link)))
}

pub async fn update<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(link_id): Path<Uuid>,
  Json(body): Json<SupplierLinkValues>,
) -> Result<Json<SupplierLink>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  Ok(Json(
    state
      .service
      .update_supplier_link(actor, link_id, body)
      .await?,
  ))
}

pub async fn unlink<S>(
  State(state): State<AppState<S>>,
  Actor(actor): Actor,
  Path(link_id): Path<Uuid>,
) -> Result<Json<SupplierLink>, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  Ok(Json(state.service.unlink_supplier(actor, link_id).await?))
}
