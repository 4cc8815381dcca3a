//! JSON API for the proposal engine.
//!
//! Exposes an axum [`Router`] backed by any [`ProposalService`], plus
//! [`FsObjectStore`], the filesystem object storage whose signed URLs the
//! router serves under `/objects`. Writes require an `x-actor-id` header
//! carrying the id of a user authenticated upstream.

pub mod actor;
pub mod error;
pub mod handlers;
pub mod objects;

pub use error::ApiError;
pub use objects::FsObjectStore;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{delete, get, post, put},
};
use proposta_core::{document::MAX_FILE_SIZE_BYTES, service::ProposalService};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{cycle, documents, objects as object_routes, proposals, suppliers};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub database_path:      PathBuf,
  pub objects_dir:        PathBuf,
  /// Prefix of every signed URL, e.g. `http://localhost:8080`.
  pub public_base_url:    String,
  pub signing_secret:     String,
  #[serde(default = "default_upload_ttl")]
  pub upload_ttl_seconds: u64,
}

fn default_upload_ttl() -> u64 { 600 }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub service: Arc<S>,
  pub objects: Arc<FsObjectStore>,
  pub config:  Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ProposalService + Clone + 'static,
{
  let object_limit = usize::try_from(MAX_FILE_SIZE_BYTES).unwrap_or(usize::MAX);

  Router::new()
    // Proposals
    .route("/proposals", get(proposals::list::<S>).post(proposals::create::<S>))
    .route(
      "/proposals/{id}",
      get(proposals::get_one::<S>).delete(proposals::delete_one::<S>),
    )
    .route("/proposals/{id}/status", post(proposals::update_status::<S>))
    .route("/proposals/{id}/base", put(proposals::update_base::<S>))
    // Revision cycle
    .route("/proposals/{id}/cycle", post(cycle::open::<S>))
    .route("/proposals/{id}/cycle/document", post(cycle::document_upload::<S>))
    .route("/proposals/{id}/cycle/close", post(cycle::close::<S>))
    .route("/proposals/{id}/cycle/cancel", post(cycle::cancel::<S>))
    // Documents
    .route("/proposals/{id}/send/document", post(documents::send_upload::<S>))
    .route("/proposals/{id}/send", post(documents::send::<S>))
    .route(
      "/proposals/{id}/attachments/upload",
      post(documents::attachment_upload::<S>),
    )
    .route(
      "/proposals/{id}/attachments",
      post(documents::finalize_attachment::<S>),
    )
    .route("/attachments/{id}", delete(documents::delete_attachment::<S>))
    .route("/attachments/{id}/download", get(documents::download_url::<S>))
    // Suppliers
    .route("/proposals/{id}/suppliers", post(suppliers::link::<S>))
    .route(
      "/supplier-links/{id}",
      put(suppliers::update::<S>).delete(suppliers::unlink::<S>),
    )
    // Signed object transport
    .route(
      "/objects/{*path}",
      put(object_routes::put::<S>)
        .get(object_routes::get::<S>)
        .layer(DefaultBodyLimit::max(object_limit)),
    )
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
  };
  use proposta_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tempfile::TempDir;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  const BASE_URL: &str = "http://localhost:8080";

  struct Harness {
    state:    AppState<SqliteStore>,
    customer: Uuid,
    actor:    Uuid,
    _dir:     TempDir,
  }

  async fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
      host:               "127.0.0.1".to_string(),
      port:               8080,
      database_path:      PathBuf::from(":memory:"),
      objects_dir:        dir.path().to_path_buf(),
      public_base_url:    BASE_URL.to_string(),
      signing_secret:     "secret".to_string(),
      upload_ttl_seconds: 600,
    };
    let objects = Arc::new(FsObjectStore::new(
      &config.objects_dir,
      &config.public_base_url,
      &config.signing_secret,
      config.upload_ttl_seconds,
    ));
    let store = SqliteStore::open_in_memory(objects.clone()).await.unwrap();
    let customer = store.add_customer("Égis Engenharia").await.unwrap();

    Harness {
      state: AppState {
        service: Arc::new(store),
        objects,
        config: Arc::new(config),
      },
      customer: customer.id,
      actor: Uuid::new_v4(),
      _dir: dir,
    }
  }

  async fn send_raw(
    state: &AppState<SqliteStore>,
    req: Request<Body>,
  ) -> (StatusCode, Vec<u8>) {
    let resp = router(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
  }

  impl Harness {
    async fn call(
      &self,
      method: Method,
      uri: &str,
      body: Option<Value>,
    ) -> (StatusCode, Value) {
      self.call_as(Some(self.actor), method, uri, body).await
    }

    async fn call_as(
      &self,
      actor: Option<Uuid>,
      method: Method,
      uri: &str,
      body: Option<Value>,
    ) -> (StatusCode, Value) {
      let mut builder = Request::builder().method(method).uri(uri);
      if let Some(actor) = actor {
        builder = builder.header(actor::ACTOR_HEADER, actor.to_string());
      }
      let req = match body {
        Some(json) => builder
          .header(header::CONTENT_TYPE, "application/json")
          .body(Body::from(json.to_string()))
          .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
      };
      let (status, bytes) = send_raw(&self.state, req).await;
      let value = if bytes.is_empty() {
        Value::Null
      } else {
        serde_json::from_slice(&bytes).unwrap()
      };
      (status, value)
    }

    async fn create(&self) -> Value {
      let (status, body) = self
        .call(
          Method::POST,
          "/proposals",
          Some(json!({
            "customer_id": self.customer,
            "year": 2026,
            "project_name": "Hospital Regional",
            "scope_description": "Modelagem BIM",
            "estimated_value": 1000,
          })),
        )
        .await;
      assert_eq!(status, StatusCode::CREATED, "{body}");
      body
    }
  }

  // ── Actor header ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn writes_require_actor_header() {
    let h = harness().await;
    let body = json!({
      "customer_id": h.customer,
      "year": 2026,
      "project_name": "Hospital Regional",
      "scope_description": "Modelagem BIM",
      "estimated_value": 1000,
    });

    let (status, _) = h
      .call_as(None, Method::POST, "/proposals", Some(body.clone()))
      .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut builder = Request::builder().method(Method::POST).uri("/proposals");
    builder = builder
      .header(actor::ACTOR_HEADER, "not-a-uuid")
      .header(header::CONTENT_TYPE, "application/json");
    let req = builder.body(Body::from(body.to_string())).unwrap();
    let (status, _) = send_raw(&h.state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  // ── Proposals ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_then_fetch_detail() {
    let h = harness().await;
    let created = h.create().await;
    assert_eq!(created["code"], "BV-EGISENGENHARIA-2026-BIM-001");
    assert_eq!(created["status"], "recebida");

    let uri = format!("/proposals/{}", created["id"].as_str().unwrap());
    let (status, detail) = h.call(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["proposal"]["code"], created["code"]);
    assert_eq!(detail["revisions"].as_array().unwrap().len(), 1);

    let (status, list) =
      h.call(Method::GET, "/proposals?status=recebida", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn unknown_proposal_is_404() {
    let h = harness().await;
    let uri = format!("/proposals/{}", Uuid::new_v4());
    let (status, body) = h.call(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("proposal not found"));
  }

  #[tokio::test]
  async fn rule_violations_are_422_with_message() {
    let h = harness().await;
    let created = h.create().await;
    let uri = format!("/proposals/{}/status", created["id"].as_str().unwrap());

    let (status, body) = h
      .call(Method::POST, &uri, Some(json!({ "status": "perdida" })))
      .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(
      body["error"].as_str().unwrap().contains("outcome reason is required"),
      "{body}"
    );

    let (status, _) = h
      .call(Method::POST, &uri, Some(json!({ "status": "em_revisao" })))
      .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  }

  // ── Send flow through signed URLs ──────────────────────────────────────────

  #[tokio::test]
  async fn send_with_uploaded_document() {
    let h = harness().await;
    let created = h.create().await;
    let id = created["id"].as_str().unwrap().to_owned();
    let code = created["code"].as_str().unwrap().to_owned();

    let (status, _) = h
      .call(
        Method::POST,
        &format!("/proposals/{id}/status"),
        Some(json!({ "status": "em_elaboracao" })),
      )
      .await;
    assert_eq!(status, StatusCode::OK);

    let file_name = format!("{code}-R0.pdf");
    let (status, ticket) = h
      .call(
        Method::POST,
        &format!("/proposals/{id}/send/document"),
        Some(json!({
          "file_name": file_name,
          "mime_type": "application/pdf",
          "size_bytes": 4,
        })),
      )
      .await;
    assert_eq!(status, StatusCode::OK, "{ticket}");
    assert_eq!(ticket["revision_number"], 0);

    // Sending before the upload fails.
    let send_body = json!({
      "document": {
        "file_name": file_name,
        "storage_path": ticket["path"],
        "mime_type": "application/pdf",
        "size_bytes": 4,
      },
    });
    let (status, _) = h
      .call(
        Method::POST,
        &format!("/proposals/{id}/send"),
        Some(send_body.clone()),
      )
      .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let upload_uri = ticket["signed_url"]
      .as_str()
      .unwrap()
      .strip_prefix(BASE_URL)
      .unwrap()
      .to_owned();
    let req = Request::builder()
      .method(Method::PUT)
      .uri(&upload_uri)
      .body(Body::from("%PDF"))
      .unwrap();
    let (status, _) = send_raw(&h.state, req).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, sent) = h
      .call(Method::POST, &format!("/proposals/{id}/send"), Some(send_body))
      .await;
    assert_eq!(status, StatusCode::OK, "{sent}");
    assert_eq!(sent["proposal"]["status"], "enviada");
    assert_eq!(sent["attachment"]["category"], "proposta_word");

    let attachment = sent["attachment"]["id"].as_str().unwrap();
    let (status, download) = h
      .call(Method::GET, &format!("/attachments/{attachment}/download"), None)
      .await;
    assert_eq!(status, StatusCode::OK);
    let download_uri = download["signed_url"]
      .as_str()
      .unwrap()
      .strip_prefix(BASE_URL)
      .unwrap()
      .to_owned();
    let req = Request::builder()
      .method(Method::GET)
      .uri(&download_uri)
      .body(Body::empty())
      .unwrap();
    let (status, bytes) = send_raw(&h.state, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"%PDF");

    let (status, _) = h
      .call(Method::DELETE, &format!("/attachments/{attachment}"), None)
      .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  }

  #[tokio::test]
  async fn object_routes_reject_bad_tokens() {
    let h = harness().await;
    let expires = chrono::Utc::now().timestamp() + 60;
    let req = Request::builder()
      .method(Method::PUT)
      .uri(format!("/objects/a/b.pdf?expires={expires}&token=deadbeef"))
      .body(Body::from("%PDF"))
      .unwrap();
    let (status, _) = send_raw(&h.state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A download token does not authorise an upload.
    let token = h.state.objects.sign(objects::Access::Download, "a/b.pdf", expires);
    let req = Request::builder()
      .method(Method::PUT)
      .uri(format!("/objects/a/b.pdf?expires={expires}&token={token}"))
      .body(Body::from("%PDF"))
      .unwrap();
    let (status, _) = send_raw(&h.state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }
}
