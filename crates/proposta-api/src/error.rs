//! API error type and [`axum::response::IntoResponse`] implementation.

use std::io;

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use proposta_core::ErrorKind;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::objects::ObjectError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  /// A business rule rejected the request.
  #[error("{0}")]
  Validation(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("missing or invalid credentials")]
  Unauthorized,

  #[error("unexpected error: {0}")]
  Unexpected(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<proposta_core::Error> for ApiError {
  fn from(err: proposta_core::Error) -> Self {
    match err.kind() {
      ErrorKind::NotFound => Self::NotFound(err.to_string()),
      ErrorKind::Validation => Self::Validation(err.to_string()),
      ErrorKind::Unexpected => Self::Unexpected(Box::new(err)),
    }
  }
}

impl From<ObjectError> for ApiError {
  fn from(err: ObjectError) -> Self {
    match err {
      ObjectError::InvalidPath(_) => Self::BadRequest(err.to_string()),
      ObjectError::Io(e) if e.kind() == io::ErrorKind::NotFound => {
        Self::NotFound("object not found".to_owned())
      }
      other => Self::Unexpected(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Validation(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::Unexpected(e) => {
        error!(error = %e, "request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "internal server error".to_owned(),
        )
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use proposta_core::{Entity, Violation};
  use uuid::Uuid;

  use super::*;

  #[test]
  fn core_errors_map_by_kind() {
    let id = Uuid::new_v4();
    let resp =
      ApiError::from(proposta_core::Error::NotFound(Entity::Proposal, id))
        .into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp =
      ApiError::from(proposta_core::Error::from(Violation::CycleRequiresSent))
        .into_response();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let io = io::Error::other("disk gone");
    let resp =
      ApiError::from(proposta_core::Error::store(io)).into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn object_errors_map_to_http() {
    let resp =
      ApiError::from(ObjectError::InvalidPath("../x".into())).into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let missing = io::Error::from(io::ErrorKind::NotFound);
    let resp = ApiError::from(ObjectError::Io(missing)).into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
