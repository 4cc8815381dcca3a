//! Transport for signed object URLs.
//!
//! `PUT /objects/{*path}` stores the request body and `GET` returns it. Both
//! require the `expires` and `token` query parameters of a URL issued by
//! [`FsObjectStore`](crate::objects::FsObjectStore).

use axum::{
  body::Bytes,
  extract::{Path, Query, State},
  http::{StatusCode, header},
  response::IntoResponse,
};
use proposta_core::service::ProposalService;
use serde::Deserialize;

use crate::{AppState, error::ApiError, objects::Access};

#[derive(Debug, Deserialize)]
pub struct SignedParams {
  pub expires: i64,
  pub token:   String,
}

fn authorize<S>(
  state: &AppState<S>,
  access: Access,
  path: &str,
  params: &SignedParams,
) -> Result<(), ApiError>
where
  S: ProposalService + Clone + 'static,
{
  if state.objects.verify(access, path, params.expires, &params.token) {
    Ok(())
  } else {
    Err(ApiError::Unauthorized)
  }
}

pub async fn put<S>(
  State(state): State<AppState<S>>,
  Path(path): Path<String>,
  Query(params): Query<SignedParams>,
  body: Bytes,
) -> Result<StatusCode, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  authorize(&state, Access::Upload, &path, &params)?;
  state.objects.write(&path, &body).await?;
  Ok(StatusCode::CREATED)
}

pub async fn get<S>(
  State(state): State<AppState<S>>,
  Path(path): Path<String>,
  Query(params): Query<SignedParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ProposalService + Clone + 'static,
{
  authorize(&state, Access::Download, &path, &params)?;
  let bytes = state.objects.read(&path).await?;
  Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}
