//! [`SqliteStore`]: the SQLite implementation of [`ProposalService`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use proposta_core::{
  Engine,
  attachment::{
    Attachment, AttachmentUploadRequest, DeletedAttachment, DownloadUrl,
    FinalizeAttachment,
  },
  cycle::CloseCycle,
  document::{DocumentRequest, DocumentUploadTicket, SendWithFile, SignedUpload},
  guard::BaseFieldsUpdate,
  history::ProposalDetail,
  ports::ObjectStorage,
  proposal::{Customer, NewProposal, Proposal, ProposalFilter, customer_slug},
  service::{
    CycleCanceledOutcome, CycleClosedOutcome, CycleOpenedOutcome,
    DeletedProposal, ProposalService, SentOutcome,
  },
  status::StatusUpdate,
  supplier::{LinkSupplier, Supplier, SupplierLink, SupplierLinkValues},
};
use rusqlite::TransactionBehavior;
use tracing::error;
use uuid::Uuid;

use crate::{Error, Result, repos::SqliteRepos, schema::SCHEMA};

type CoreResult<T> = proposta_core::Result<T>;

/// The engine as seen by a store operation.
type StoreEngine<'e> = Engine<'e, SqliteRepos<'e>, dyn ObjectStorage>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A proposal store backed by a single SQLite file.
///
/// Cloning is cheap: the connection and object storage are both
/// reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  objects:         Arc<dyn ObjectStorage>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(
    path: impl AsRef<Path>,
    objects: Arc<dyn ObjectStorage>,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, objects };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory(objects: Arc<dyn ObjectStorage>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, objects };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Reference data ────────────────────────────────────────────────────

  /// Register a customer; its slug is derived from `name`.
  pub async fn add_customer(&self, name: &str) -> Result<Customer> {
    let customer = Customer {
      id:         Uuid::new_v4(),
      name:       name.trim().to_owned(),
      slug:       customer_slug(name).map_err(proposta_core::Error::from)?,
      created_at: Utc::now(),
    };
    let row = customer.clone();
    self
      .conn
      .call(move |conn| Ok(SqliteRepos::new(conn).insert_customer(&row)))
      .await??;
    Ok(customer)
  }

  pub async fn add_supplier(
    &self,
    legal_name: &str,
    specialty: &str,
  ) -> Result<Supplier> {
    let supplier = Supplier {
      id:         Uuid::new_v4(),
      legal_name: legal_name.trim().to_owned(),
      specialty:  specialty.trim().to_owned(),
      created_at: Utc::now(),
    };
    let row = supplier.clone();
    self
      .conn
      .call(move |conn| Ok(SqliteRepos::new(conn).insert_supplier(&row)))
      .await??;
    Ok(supplier)
  }

  // ── Transactions ──────────────────────────────────────────────────────

  /// Run one engine operation inside a `BEGIN IMMEDIATE` transaction.
  ///
  /// The transaction commits only when the operation returns `Ok`; any
  /// error rolls back every row and event it wrote.
  async fn transact<T, F>(&self, op: F) -> CoreResult<T>
  where
    T: Send + 'static,
    F: for<'e> FnOnce(&StoreEngine<'e>) -> CoreResult<T> + Send + 'static,
  {
    let objects = Arc::clone(&self.objects);
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = {
          let repos = SqliteRepos::new(&tx);
          op(&Engine::new(&repos, &*objects))
        };
        if outcome.is_ok() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await
      .map_err(|err| {
        error!(error = %err, "store operation failed");
        Error::from(err)
      })?;
    outcome
  }
}

// ─── ProposalService impl ────────────────────────────────────────────────────

impl ProposalService for SqliteStore {
  // ── Proposals ─────────────────────────────────────────────────────────────

  async fn create_proposal(
    &self,
    actor: Uuid,
    input: NewProposal,
  ) -> CoreResult<Proposal> {
    self
      .transact(move |engine| engine.create_proposal(actor, input))
      .await
  }

  async fn list_proposals(
    &self,
    filter: ProposalFilter,
  ) -> CoreResult<Vec<Proposal>> {
    self
      .transact(move |engine| engine.list_proposals(&filter))
      .await
  }

  async fn proposal_detail(&self, proposal_id: Uuid) -> CoreResult<ProposalDetail> {
    self
      .transact(move |engine| engine.proposal_detail(proposal_id))
      .await
  }

  async fn delete_proposal(
    &self,
    proposal_id: Uuid,
  ) -> CoreResult<DeletedProposal> {
    self
      .transact(move |engine| engine.delete_proposal(proposal_id))
      .await
  }

  async fn update_status(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    update: StatusUpdate,
  ) -> CoreResult<Proposal> {
    self
      .transact(move |engine| engine.update_status(actor, proposal_id, &update))
      .await
  }

  async fn update_base_fields(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    update: BaseFieldsUpdate,
  ) -> CoreResult<Proposal> {
    self
      .transact(move |engine| {
        engine.update_base_fields(actor, proposal_id, &update)
      })
      .await
  }

  // ── Revision cycle ────────────────────────────────────────────────────────

  async fn open_cycle(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
  ) -> CoreResult<CycleOpenedOutcome> {
    self
      .transact(move |engine| engine.open_cycle(actor, proposal_id))
      .await
  }

  async fn close_cycle(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    input: CloseCycle,
  ) -> CoreResult<CycleClosedOutcome> {
    self
      .transact(move |engine| engine.close_cycle(actor, proposal_id, &input))
      .await
  }

  async fn cancel_cycle(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
  ) -> CoreResult<CycleCanceledOutcome> {
    self
      .transact(move |engine| engine.cancel_cycle(actor, proposal_id))
      .await
  }

  async fn prepare_revision_document_upload(
    &self,
    proposal_id: Uuid,
    document: DocumentRequest,
  ) -> CoreResult<DocumentUploadTicket> {
    self
      .transact(move |engine| {
        engine.prepare_revision_document_upload(proposal_id, &document)
      })
      .await
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn prepare_send_upload(
    &self,
    proposal_id: Uuid,
    document: DocumentRequest,
  ) -> CoreResult<DocumentUploadTicket> {
    self
      .transact(move |engine| engine.prepare_send_upload(proposal_id, &document))
      .await
  }

  async fn send_with_file(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    input: SendWithFile,
  ) -> CoreResult<SentOutcome> {
    self
      .transact(move |engine| engine.send_with_file(actor, proposal_id, &input))
      .await
  }

  async fn create_attachment_upload(
    &self,
    proposal_id: Uuid,
    request: AttachmentUploadRequest,
  ) -> CoreResult<SignedUpload> {
    self
      .transact(move |engine| {
        engine.create_attachment_upload(proposal_id, &request)
      })
      .await
  }

  async fn finalize_attachment(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    input: FinalizeAttachment,
  ) -> CoreResult<Attachment> {
    self
      .transact(move |engine| {
        engine.finalize_attachment(actor, proposal_id, &input)
      })
      .await
  }

  async fn delete_attachment(
    &self,
    attachment_id: Uuid,
  ) -> CoreResult<DeletedAttachment> {
    self
      .transact(move |engine| engine.delete_attachment(attachment_id))
      .await
  }

  async fn attachment_download_url(
    &self,
    attachment_id: Uuid,
  ) -> CoreResult<DownloadUrl> {
    self
      .transact(move |engine| engine.attachment_download_url(attachment_id))
      .await
  }

  // ── Suppliers ─────────────────────────────────────────────────────────────

  async fn link_supplier(
    &self,
    actor: Uuid,
    proposal_id: Uuid,
    input: LinkSupplier,
  ) -> CoreResult<SupplierLink> {
    self
      .transact(move |engine| engine.link_supplier(actor, proposal_id, &input))
      .await
  }

  async fn update_supplier_link(
    &self,
    actor: Uuid,
    link_id: Uuid,
    values: SupplierLinkValues,
  ) -> CoreResult<SupplierLink> {
    self
      .transact(move |engine| {
        engine.update_supplier_link(actor, link_id, &values)
      })
      .await
  }

  async fn unlink_supplier(
    &self,
    actor: Uuid,
    link_id: Uuid,
  ) -> CoreResult<SupplierLink> {
    self
      .transact(move |engine| engine.unlink_supplier(actor, link_id))
      .await
  }
}
