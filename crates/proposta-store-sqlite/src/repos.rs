//! The repository ports implemented over one open SQLite connection or
//! transaction.
//!
//! Each port method delegates to an inherent method returning this crate's
//! [`Error`]; the conversion into [`proposta_core::Error`] happens at the
//! trait boundary.

use chrono::Utc;
use proposta_core::{
  Entity, Violation,
  attachment::{Attachment, NewAttachment},
  event::{ActivityEvent, NewActivityEvent},
  ports::{
    ActivityLog, AttachmentRepository, ProposalRepository, RevisionRepository,
    SupplierLinkRepository,
  },
  proposal::{
    BaseFields, Customer, NewRevision, Proposal, ProposalFilter,
    ProposalRecord, Revision, RevisionFinalization, StatusWrite,
    StorageContext,
  },
  supplier::{NewSupplierLink, Supplier, SupplierLink, SupplierLinkValues},
};
use rusqlite::{Connection, OptionalExtension as _, params};
use tracing::warn;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    ATTACHMENT_COLUMNS, CUSTOMER_COLUMNS, EVENT_COLUMNS, LINK_SELECT,
    PROPOSAL_COLUMNS, REVISION_COLUMNS, RawAttachment, RawCustomer, RawEvent,
    RawProposal, RawRevision, RawSupplier, RawSupplierLink, SUPPLIER_COLUMNS,
    decode_count, encode_date, encode_dt, encode_uuid,
  },
};

type CoreResult<T> = proposta_core::Result<T>;

/// Whether `err` is a `UNIQUE` constraint failure.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

/// Decode every row, failing on the first bad one.
fn decode_rows<T, U>(
  rows: impl Iterator<Item = rusqlite::Result<T>>,
  decode: impl Fn(T) -> Result<U>,
) -> Result<Vec<U>> {
  rows.map(|row| decode(row?)).collect()
}

/// Fail with `NotFound` when a row that was just written cannot be read back.
fn require<T>(row: Option<T>, entity: Entity, id: Uuid) -> Result<T> {
  row.ok_or(Error::Core(proposta_core::Error::NotFound(entity, id)))
}

/// Wrap a free-text search in `%...%`, escaping LIKE metacharacters.
fn like_pattern(search: &str) -> String {
  let mut pattern = String::from("%");
  for c in search.chars() {
    if matches!(c, '\\' | '%' | '_') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}

// ─── Repositories ────────────────────────────────────────────────────────────

/// Every repository port over a borrowed connection. Built over a
/// [`rusqlite::Transaction`] for the duration of one engine operation.
pub struct SqliteRepos<'c> {
  conn: &'c Connection,
}

impl<'c> SqliteRepos<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }

  // ── Customers & suppliers ─────────────────────────────────────────────

  pub fn insert_customer(&self, customer: &Customer) -> Result<()> {
    self.conn.execute(
      "INSERT INTO customers (id, name, slug, created_at)
       VALUES (?1, ?2, ?3, ?4)",
      params![
        encode_uuid(customer.id),
        customer.name,
        customer.slug,
        encode_dt(customer.created_at),
      ],
    )?;
    Ok(())
  }

  pub fn insert_supplier(&self, supplier: &Supplier) -> Result<()> {
    self.conn.execute(
      "INSERT INTO suppliers (id, legal_name, specialty, created_at)
       VALUES (?1, ?2, ?3, ?4)",
      params![
        encode_uuid(supplier.id),
        supplier.legal_name,
        supplier.specialty,
        encode_dt(supplier.created_at),
      ],
    )?;
    Ok(())
  }

  fn customer(&self, id: Uuid) -> Result<Option<Customer>> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
    self
      .conn
      .query_row(&sql, params![encode_uuid(id)], RawCustomer::from_row)
      .optional()?
      .map(RawCustomer::into_customer)
      .transpose()
  }

  fn supplier(&self, id: Uuid) -> Result<Option<Supplier>> {
    let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = ?1");
    self
      .conn
      .query_row(&sql, params![encode_uuid(id)], RawSupplier::from_row)
      .optional()?
      .map(RawSupplier::into_supplier)
      .transpose()
  }

  // ── Proposals ─────────────────────────────────────────────────────────

  fn proposal(&self, id: Uuid) -> Result<Option<Proposal>> {
    let sql = format!("SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = ?1");
    self
      .conn
      .query_row(&sql, params![encode_uuid(id)], RawProposal::from_row)
      .optional()?
      .map(RawProposal::into_proposal)
      .transpose()
  }

  fn context(&self, id: Uuid) -> Result<Option<StorageContext>> {
    let row: Option<(String, i32, String)> = self
      .conn
      .query_row(
        "SELECT p.code, p.year, c.slug
         FROM proposals p
         JOIN customers c ON c.id = p.customer_id
         WHERE p.id = ?1",
        params![encode_uuid(id)],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
      )
      .optional()?;
    Ok(row.map(|(proposal_code, year, customer_slug)| StorageContext {
      proposal_id: id,
      proposal_code,
      year,
      customer_slug,
    }))
  }

  fn next_sequence(&self, customer_id: Uuid, year: i32) -> Result<u32> {
    let seq: i64 = self.conn.query_row(
      "INSERT INTO proposal_sequences (customer_id, year, last_seq)
       VALUES (?1, ?2, 1)
       ON CONFLICT (customer_id, year) DO UPDATE SET last_seq = last_seq + 1
       RETURNING last_seq",
      params![encode_uuid(customer_id), year],
      |r| r.get(0),
    )?;
    decode_count(seq, "last_seq")
  }

  fn insert_proposal(&self, record: ProposalRecord) -> Result<Proposal> {
    let id = Uuid::new_v4();
    let now = encode_dt(Utc::now());
    let fields = &record.fields;
    self.conn.execute(
      "INSERT INTO proposals (
         id, customer_id, code, year, seq_number, project_name,
         scope_description, invitation_code, due_date, estimated_value,
         final_value, outcome_reason, status, created_by, created_at,
         updated_at
       ) VALUES (
         ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
         NULL, NULL, 'recebida', ?11, ?12, ?12
       )",
      params![
        encode_uuid(id),
        encode_uuid(record.customer_id),
        record.code,
        record.year,
        record.seq_number,
        fields.project_name,
        fields.scope_description,
        fields.invitation_code,
        fields.due_date.map(encode_date),
        fields.estimated_value.hundredths(),
        encode_uuid(record.created_by),
        now,
      ],
    )?;
    require(self.proposal(id)?, Entity::Proposal, id)
  }

  fn write_base_fields(&self, id: Uuid, fields: &BaseFields) -> Result<Proposal> {
    self.conn.execute(
      "UPDATE proposals
       SET project_name = ?2, invitation_code = ?3, scope_description = ?4,
           due_date = ?5, estimated_value = ?6, updated_at = ?7
       WHERE id = ?1",
      params![
        encode_uuid(id),
        fields.project_name,
        fields.invitation_code,
        fields.scope_description,
        fields.due_date.map(encode_date),
        fields.estimated_value.hundredths(),
        encode_dt(Utc::now()),
      ],
    )?;
    require(self.proposal(id)?, Entity::Proposal, id)
  }

  fn write_status(&self, id: Uuid, write: &StatusWrite) -> Result<Proposal> {
    self.conn.execute(
      "UPDATE proposals
       SET status = ?2, outcome_reason = ?3, final_value = ?4, updated_at = ?5
       WHERE id = ?1",
      params![
        encode_uuid(id),
        write.status.as_str(),
        write.outcome_reason,
        write.final_value.map(|v| v.hundredths()),
        encode_dt(Utc::now()),
      ],
    )?;
    require(self.proposal(id)?, Entity::Proposal, id)
  }

  fn list_proposals(&self, filter: &ProposalFilter) -> Result<Vec<Proposal>> {
    let sql = format!(
      "SELECT {PROPOSAL_COLUMNS} FROM proposals
       WHERE (?1 IS NULL OR status = ?1)
         AND (?2 IS NULL
              OR code LIKE ?2 ESCAPE '\\'
              OR project_name LIKE ?2 ESCAPE '\\'
              OR invitation_code LIKE ?2 ESCAPE '\\')
       ORDER BY created_at DESC, code DESC
       LIMIT ?3"
    );
    let status = filter.status.map(|s| s.as_str());
    let search = filter
      .search
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(like_pattern);
    let limit = filter
      .limit
      .map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));

    let mut stmt = self.conn.prepare(&sql)?;
    let rows =
      stmt.query_map(params![status, search, limit], RawProposal::from_row)?;
    decode_rows(rows, RawProposal::into_proposal)
  }

  fn delete_proposal(&self, id: Uuid) -> Result<()> {
    let id = encode_uuid(id);
    for sql in [
      "DELETE FROM proposal_attachments WHERE proposal_id = ?1",
      "DELETE FROM proposal_suppliers WHERE proposal_id = ?1",
      "DELETE FROM proposal_revisions WHERE proposal_id = ?1",
      "DELETE FROM proposals WHERE id = ?1",
    ] {
      self.conn.execute(sql, params![id])?;
    }
    Ok(())
  }

  // ── Revisions ─────────────────────────────────────────────────────────

  fn next_number(&self, proposal_id: Uuid) -> Result<u32> {
    let next: i64 = self.conn.query_row(
      "SELECT COALESCE(MAX(revision_number) + 1, 0)
       FROM proposal_revisions WHERE proposal_id = ?1",
      params![encode_uuid(proposal_id)],
      |r| r.get(0),
    )?;
    decode_count(next, "revision_number")
  }

  fn revision(&self, id: Uuid) -> Result<Option<Revision>> {
    let sql =
      format!("SELECT {REVISION_COLUMNS} FROM proposal_revisions WHERE id = ?1");
    self
      .conn
      .query_row(&sql, params![encode_uuid(id)], RawRevision::from_row)
      .optional()?
      .map(RawRevision::into_revision)
      .transpose()
  }

  fn revisions(&self, proposal_id: Uuid) -> Result<Vec<Revision>> {
    let sql = format!(
      "SELECT {REVISION_COLUMNS} FROM proposal_revisions
       WHERE proposal_id = ?1
       ORDER BY revision_number DESC"
    );
    let mut stmt = self.conn.prepare(&sql)?;
    let rows =
      stmt.query_map(params![encode_uuid(proposal_id)], RawRevision::from_row)?;
    decode_rows(rows, RawRevision::into_revision)
  }

  fn insert_revision(&self, revision: NewRevision) -> Result<Revision> {
    let id = Uuid::new_v4();
    self.conn.execute(
      "INSERT INTO proposal_revisions (
         id, proposal_id, revision_number, value_after, created_by, created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
      params![
        encode_uuid(id),
        encode_uuid(revision.proposal_id),
        revision.revision_number,
        revision.value_after.map(|v| v.hundredths()),
        encode_uuid(revision.created_by),
        encode_dt(Utc::now()),
      ],
    )?;
    require(self.revision(id)?, Entity::Revision, id)
  }

  fn finalize_revision(
    &self,
    id: Uuid,
    values: &RevisionFinalization,
  ) -> Result<Revision> {
    self.conn.execute(
      "UPDATE proposal_revisions
       SET reason = ?2, scope_changes = ?3, notes = ?4, value_before = ?5,
           value_after = ?6, discount = ?7, discount_percent = ?8
       WHERE id = ?1",
      params![
        encode_uuid(id),
        values.reason,
        values.scope_changes,
        values.notes,
        values.value_before.map(|v| v.hundredths()),
        values.value_after.map(|v| v.hundredths()),
        values.discount.map(|v| v.hundredths()),
        values.discount_percent.map(|v| v.hundredths()),
      ],
    )?;
    require(self.revision(id)?, Entity::Revision, id)
  }

  // ── Activity log ──────────────────────────────────────────────────────

  fn append_event(&self, event: NewActivityEvent) -> Result<ActivityEvent> {
    let appended = ActivityEvent {
      id:          Uuid::new_v4(),
      entity_type: event.entity_type,
      entity_id:   event.entity_id,
      created_by:  event.created_by,
      created_at:  Utc::now(),
      payload:     event.payload,
    };
    let metadata = appended.payload.to_json()?.to_string();
    self.conn.execute(
      "INSERT INTO activity_log (
         id, entity_type, entity_id, action, metadata, created_by, created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
      params![
        encode_uuid(appended.id),
        appended.entity_type,
        encode_uuid(appended.entity_id),
        appended.payload.action(),
        metadata,
        encode_uuid(appended.created_by),
        encode_dt(appended.created_at),
      ],
    )?;
    Ok(appended)
  }

  fn events(&self, entity_type: &str, entity_id: Uuid) -> Result<Vec<ActivityEvent>> {
    let sql = format!(
      "SELECT {EVENT_COLUMNS} FROM activity_log
       WHERE entity_type = ?1 AND entity_id = ?2
       ORDER BY created_at DESC, seq DESC"
    );
    let mut stmt = self.conn.prepare(&sql)?;
    let rows = stmt.query_map(
      params![entity_type, encode_uuid(entity_id)],
      RawEvent::from_row,
    )?;

    let mut events = Vec::new();
    for row in rows {
      let raw = row?;
      let id = raw.id.clone();
      match raw.into_event() {
        Ok(event) => events.push(event),
        Err(err) => {
          warn!(event = %id, error = %err, "skipping undecodable activity event")
        }
      }
    }
    Ok(events)
  }

  // ── Supplier links ────────────────────────────────────────────────────

  fn link(&self, id: Uuid) -> Result<Option<SupplierLink>> {
    let sql = format!("{LINK_SELECT} WHERE l.id = ?1");
    self
      .conn
      .query_row(&sql, params![encode_uuid(id)], RawSupplierLink::from_row)
      .optional()?
      .map(RawSupplierLink::into_link)
      .transpose()
  }

  fn links(&self, proposal_id: Uuid) -> Result<Vec<SupplierLink>> {
    let sql = format!(
      "{LINK_SELECT}
       WHERE l.proposal_id = ?1
       ORDER BY r.revision_number DESC, l.created_at, s.legal_name"
    );
    let mut stmt = self.conn.prepare(&sql)?;
    let rows = stmt
      .query_map(params![encode_uuid(proposal_id)], RawSupplierLink::from_row)?;
    decode_rows(rows, RawSupplierLink::into_link)
  }

  fn links_of_revision(&self, revision_id: Uuid) -> Result<Vec<SupplierLink>> {
    let sql = format!("{LINK_SELECT} WHERE l.revision_id = ?1 ORDER BY l.created_at");
    let mut stmt = self.conn.prepare(&sql)?;
    let rows = stmt
      .query_map(params![encode_uuid(revision_id)], RawSupplierLink::from_row)?;
    decode_rows(rows, RawSupplierLink::into_link)
  }

  fn link_exists(
    &self,
    proposal_id: Uuid,
    supplier_id: Uuid,
    revision_id: Uuid,
  ) -> Result<bool> {
    let found = self
      .conn
      .query_row(
        "SELECT 1 FROM proposal_suppliers
         WHERE proposal_id = ?1 AND supplier_id = ?2 AND revision_id = ?3",
        params![
          encode_uuid(proposal_id),
          encode_uuid(supplier_id),
          encode_uuid(revision_id),
        ],
        |_| Ok(()),
      )
      .optional()?;
    Ok(found.is_some())
  }

  fn insert_link(
    &self,
    proposal_id: Uuid,
    revision_id: Uuid,
    supplier_id: Uuid,
    values: &SupplierLinkValues,
  ) -> Result<SupplierLink> {
    let id = Uuid::new_v4();
    self.conn.execute(
      "INSERT INTO proposal_suppliers (
         id, proposal_id, revision_id, supplier_id, role_description,
         quoted_hourly_cost, estimated_hours, quoted_total, created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
      params![
        encode_uuid(id),
        encode_uuid(proposal_id),
        encode_uuid(revision_id),
        encode_uuid(supplier_id),
        values.role_description,
        values.quoted_hourly_cost.map(|v| v.hundredths()),
        values.estimated_hours.map(|v| v.hundredths()),
        values.quoted_total.map(|v| v.hundredths()),
        encode_dt(Utc::now()),
      ],
    )?;
    require(self.link(id)?, Entity::SupplierLink, id)
  }

  fn copy_links(
    &self,
    proposal_id: Uuid,
    source_revision: Uuid,
    target_revision: Uuid,
  ) -> Result<u32> {
    let mut copied = 0;
    for link in self.links_of_revision(source_revision)? {
      if link.proposal_id != proposal_id {
        continue;
      }
      let values = SupplierLinkValues {
        role_description:   link.role_description,
        quoted_hourly_cost: link.quoted_hourly_cost,
        estimated_hours:    link.estimated_hours,
        quoted_total:       link.quoted_total,
      };
      self.insert_link(proposal_id, target_revision, link.supplier_id, &values)?;
      copied += 1;
    }
    Ok(copied)
  }

  fn write_link_values(
    &self,
    id: Uuid,
    values: &SupplierLinkValues,
  ) -> Result<SupplierLink> {
    self.conn.execute(
      "UPDATE proposal_suppliers
       SET role_description = ?2, quoted_hourly_cost = ?3,
           estimated_hours = ?4, quoted_total = ?5
       WHERE id = ?1",
      params![
        encode_uuid(id),
        values.role_description,
        values.quoted_hourly_cost.map(|v| v.hundredths()),
        values.estimated_hours.map(|v| v.hundredths()),
        values.quoted_total.map(|v| v.hundredths()),
      ],
    )?;
    require(self.link(id)?, Entity::SupplierLink, id)
  }

  // ── Attachments ───────────────────────────────────────────────────────

  fn attachment(&self, id: Uuid) -> Result<Option<Attachment>> {
    let sql = format!(
      "SELECT {ATTACHMENT_COLUMNS} FROM proposal_attachments WHERE id = ?1"
    );
    self
      .conn
      .query_row(&sql, params![encode_uuid(id)], RawAttachment::from_row)
      .optional()?
      .map(RawAttachment::into_attachment)
      .transpose()
  }

  fn attachments(&self, proposal_id: Uuid) -> Result<Vec<Attachment>> {
    let sql = format!(
      "SELECT {ATTACHMENT_COLUMNS} FROM proposal_attachments
       WHERE proposal_id = ?1
       ORDER BY created_at DESC, rowid DESC"
    );
    let mut stmt = self.conn.prepare(&sql)?;
    let rows = stmt
      .query_map(params![encode_uuid(proposal_id)], RawAttachment::from_row)?;
    decode_rows(rows, RawAttachment::into_attachment)
  }

  fn insert_attachment(&self, attachment: NewAttachment) -> Result<Attachment> {
    let id = Uuid::new_v4();
    let size_bytes = i64::try_from(attachment.size_bytes).map_err(|_| {
      Error::Decode(format!("size out of range: {}", attachment.size_bytes))
    })?;
    self.conn.execute(
      "INSERT INTO proposal_attachments (
         id, proposal_id, revision_id, category, file_name, storage_path,
         mime_type, size_bytes, uploaded_by, created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      params![
        encode_uuid(id),
        encode_uuid(attachment.proposal_id),
        attachment.revision_id.map(encode_uuid),
        attachment.category.as_str(),
        attachment.file_name,
        attachment.storage_path,
        attachment.mime_type,
        size_bytes,
        encode_uuid(attachment.uploaded_by),
        encode_dt(Utc::now()),
      ],
    )
    .map_err(|err| {
      if is_unique_violation(&err) {
        Error::Core(Violation::DuplicateStoragePath.into())
      } else {
        err.into()
      }
    })?;
    require(self.attachment(id)?, Entity::Attachment, id)
  }

  fn delete_where(&self, sql: &str, id: Uuid) -> Result<()> {
    self.conn.execute(sql, params![encode_uuid(id)])?;
    Ok(())
  }
}

// ─── Port impls ──────────────────────────────────────────────────────────────

impl ProposalRepository for SqliteRepos<'_> {
  fn get_by_id(&self, id: Uuid) -> CoreResult<Option<Proposal>> {
    Ok(self.proposal(id)?)
  }

  fn storage_context(&self, id: Uuid) -> CoreResult<Option<StorageContext>> {
    Ok(self.context(id)?)
  }

  fn find_customer(&self, id: Uuid) -> CoreResult<Option<Customer>> {
    Ok(self.customer(id)?)
  }

  fn allocate_next_sequence(&self, customer_id: Uuid, year: i32) -> CoreResult<u32> {
    Ok(self.next_sequence(customer_id, year)?)
  }

  fn create(&self, record: ProposalRecord) -> CoreResult<Proposal> {
    Ok(self.insert_proposal(record)?)
  }

  fn update_base_fields(&self, id: Uuid, fields: &BaseFields) -> CoreResult<Proposal> {
    Ok(self.write_base_fields(id, fields)?)
  }

  fn update_status(&self, id: Uuid, write: &StatusWrite) -> CoreResult<Proposal> {
    Ok(self.write_status(id, write)?)
  }

  fn list(&self, filter: &ProposalFilter) -> CoreResult<Vec<Proposal>> {
    Ok(self.list_proposals(filter)?)
  }

  fn delete_by_id(&self, id: Uuid) -> CoreResult<()> {
    Ok(self.delete_proposal(id)?)
  }
}

impl RevisionRepository for SqliteRepos<'_> {
  fn next_revision_number(&self, proposal_id: Uuid) -> CoreResult<u32> {
    Ok(self.next_number(proposal_id)?)
  }

  fn find_by_id(&self, id: Uuid) -> CoreResult<Option<Revision>> {
    Ok(self.revision(id)?)
  }

  fn find_many_by_proposal(&self, proposal_id: Uuid) -> CoreResult<Vec<Revision>> {
    Ok(self.revisions(proposal_id)?)
  }

  fn create(&self, revision: NewRevision) -> CoreResult<Revision> {
    Ok(self.insert_revision(revision)?)
  }

  fn finalize(&self, id: Uuid, values: &RevisionFinalization) -> CoreResult<Revision> {
    Ok(self.finalize_revision(id, values)?)
  }

  fn delete_by_id(&self, id: Uuid) -> CoreResult<()> {
    Ok(self.delete_where("DELETE FROM proposal_revisions WHERE id = ?1", id)?)
  }
}

impl ActivityLog for SqliteRepos<'_> {
  fn append(&self, event: NewActivityEvent) -> CoreResult<ActivityEvent> {
    Ok(self.append_event(event)?)
  }

  fn find_many_by_entity(
    &self,
    entity_type: &str,
    entity_id: Uuid,
  ) -> CoreResult<Vec<ActivityEvent>> {
    Ok(self.events(entity_type, entity_id)?)
  }
}

impl SupplierLinkRepository for SqliteRepos<'_> {
  fn find_supplier(&self, id: Uuid) -> CoreResult<Option<Supplier>> {
    Ok(self.supplier(id)?)
  }

  fn find_by_id(&self, link_id: Uuid) -> CoreResult<Option<SupplierLink>> {
    Ok(self.link(link_id)?)
  }

  fn find_many_by_proposal(&self, proposal_id: Uuid) -> CoreResult<Vec<SupplierLink>> {
    Ok(self.links(proposal_id)?)
  }

  fn exists_link(
    &self,
    proposal_id: Uuid,
    supplier_id: Uuid,
    revision_id: Uuid,
  ) -> CoreResult<bool> {
    Ok(self.link_exists(proposal_id, supplier_id, revision_id)?)
  }

  fn create_link(&self, link: NewSupplierLink) -> CoreResult<SupplierLink> {
    Ok(self.insert_link(
      link.proposal_id,
      link.revision_id,
      link.supplier_id,
      &link.values,
    )?)
  }

  fn copy_revision_links(
    &self,
    proposal_id: Uuid,
    source_revision: Uuid,
    target_revision: Uuid,
  ) -> CoreResult<u32> {
    Ok(self.copy_links(proposal_id, source_revision, target_revision)?)
  }

  fn update_link_values(
    &self,
    link_id: Uuid,
    values: &SupplierLinkValues,
  ) -> CoreResult<SupplierLink> {
    Ok(self.write_link_values(link_id, values)?)
  }

  fn delete_by_id(&self, link_id: Uuid) -> CoreResult<()> {
    Ok(self.delete_where("DELETE FROM proposal_suppliers WHERE id = ?1", link_id)?)
  }

  fn delete_many_by_revision(&self, revision_id: Uuid) -> CoreResult<()> {
    Ok(self.delete_where(
      "DELETE FROM proposal_suppliers WHERE revision_id = ?1",
      revision_id,
    )?)
  }
}

impl AttachmentRepository for SqliteRepos<'_> {
  fn create(&self, attachment: NewAttachment) -> CoreResult<Attachment> {
    Ok(self.insert_attachment(attachment)?)
  }

  fn find_by_id(&self, id: Uuid) -> CoreResult<Option<Attachment>> {
    Ok(self.attachment(id)?)
  }

  fn find_many_by_proposal(&self, proposal_id: Uuid) -> CoreResult<Vec<Attachment>> {
    Ok(self.attachments(proposal_id)?)
  }

  fn delete_by_id(&self, id: Uuid) -> CoreResult<()> {
    Ok(self.delete_where("DELETE FROM proposal_attachments WHERE id = ?1", id)?)
  }

  fn delete_many_by_revision(&self, revision_id: Uuid) -> CoreResult<()> {
    Ok(self.delete_where(
      "DELETE FROM proposal_attachments WHERE revision_id = ?1",
      revision_id,
    )?)
  }
}
