//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with fixed microsecond precision, so
//! string order is time order. Money and quantities are integer hundredths.
//! UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use proposta_core::{
  attachment::{Attachment, AttachmentCategory},
  event::{ActivityEvent, EventPayload},
  money::{Brl, Hours, Percent},
  proposal::{Customer, Proposal, Revision},
  status::ProposalStatus,
  supplier::{Supplier, SupplierLink},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(date: NaiveDate) -> String {
  date.format("%Y-%m-%d").to_string()
}

fn decode_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.map(|s| {
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
      .map_err(|e| Error::DateParse(e.to_string()))
  })
  .transpose()
}

fn decode_status(s: &str) -> Result<ProposalStatus> {
  s.parse().map_err(Error::Decode)
}

fn decode_category(s: &str) -> Result<AttachmentCategory> {
  s.parse().map_err(Error::Decode)
}

pub fn decode_count(value: i64, column: &str) -> Result<u32> {
  u32::try_from(value)
    .map_err(|_| Error::Decode(format!("{column} out of range: {value}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const CUSTOMER_COLUMNS: &str = "id, name, slug, created_at";

/// Raw values read directly from a `customers` row.
pub struct RawCustomer {
  pub id:         String,
  pub name:       String,
  pub slug:       String,
  pub created_at: String,
}

impl RawCustomer {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      slug:       row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_customer(self) -> Result<Customer> {
    Ok(Customer {
      id:         decode_uuid(&self.id)?,
      name:       self.name,
      slug:       self.slug,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const SUPPLIER_COLUMNS: &str = "id, legal_name, specialty, created_at";

pub struct RawSupplier {
  pub id:         String,
  pub legal_name: String,
  pub specialty:  String,
  pub created_at: String,
}

impl RawSupplier {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      legal_name: row.get(1)?,
      specialty:  row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_supplier(self) -> Result<Supplier> {
    Ok(Supplier {
      id:         decode_uuid(&self.id)?,
      legal_name: self.legal_name,
      specialty:  self.specialty,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const PROPOSAL_COLUMNS: &str = "id, customer_id, code, year, seq_number, \
  project_name, scope_description, invitation_code, due_date, \
  estimated_value, final_value, outcome_reason, status, created_by, \
  created_at, updated_at";

/// Raw values read directly from a `proposals` row.
pub struct RawProposal {
  pub id:                String,
  pub customer_id:       String,
  pub code:              String,
  pub year:              i32,
  pub seq_number:        i64,
  pub project_name:      String,
  pub scope_description: String,
  pub invitation_code:   Option<String>,
  pub due_date:          Option<String>,
  pub estimated_value:   i64,
  pub final_value:       Option<i64>,
  pub outcome_reason:    Option<String>,
  pub status:            String,
  pub created_by:        String,
  pub created_at:        String,
  pub updated_at:        String,
}

impl RawProposal {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      customer_id:       row.get(1)?,
      code:              row.get(2)?,
      year:              row.get(3)?,
      seq_number:        row.get(4)?,
      project_name:      row.get(5)?,
      scope_description: row.get(6)?,
      invitation_code:   row.get(7)?,
      due_date:          row.get(8)?,
      estimated_value:   row.get(9)?,
      final_value:       row.get(10)?,
      outcome_reason:    row.get(11)?,
      status:            row.get(12)?,
      created_by:        row.get(13)?,
      created_at:        row.get(14)?,
      updated_at:        row.get(15)?,
    })
  }

  pub fn into_proposal(self) -> Result<Proposal> {
    Ok(Proposal {
      id:                decode_uuid(&self.id)?,
      customer_id:       decode_uuid(&self.customer_id)?,
      code:              self.code,
      year:              self.year,
      seq_number:        decode_count(self.seq_number, "seq_number")?,
      project_name:      self.project_name,
      scope_description: self.scope_description,
      invitation_code:   self.invitation_code,
      due_date:          decode_date(self.due_date)?,
      estimated_value:   Brl::from_hundredths(self.estimated_value),
      final_value:       self.final_value.map(Brl::from_hundredths),
      outcome_reason:    self.outcome_reason,
      status:            decode_status(&self.status)?,
      created_by:        decode_uuid(&self.created_by)?,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

pub const REVISION_COLUMNS: &str = "id, proposal_id, revision_number, reason, \
  scope_changes, notes, value_before, value_after, discount, \
  discount_percent, created_by, created_at";

pub struct RawRevision {
  pub id:               String,
  pub proposal_id:      String,
  pub revision_number:  i64,
  pub reason:           Option<String>,
  pub scope_changes:    Option<String>,
  pub notes:            Option<String>,
  pub value_before:     Option<i64>,
  pub value_after:      Option<i64>,
  pub discount:         Option<i64>,
  pub discount_percent: Option<i64>,
  pub created_by:       String,
  pub created_at:       String,
}

impl RawRevision {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      proposal_id:      row.get(1)?,
      revision_number:  row.get(2)?,
      reason:           row.get(3)?,
      scope_changes:    row.get(4)?,
      notes:            row.get(5)?,
      value_before:     row.get(6)?,
      value_after:      row.get(7)?,
      discount:         row.get(8)?,
      discount_percent: row.get(9)?,
      created_by:       row.get(10)?,
      created_at:       row.get(11)?,
    })
  }

  pub fn into_revision(self) -> Result<Revision> {
    Ok(Revision {
      id:               decode_uuid(&self.id)?,
      proposal_id:      decode_uuid(&self.proposal_id)?,
      revision_number:  decode_count(self.revision_number, "revision_number")?,
      reason:           self.reason,
      scope_changes:    self.scope_changes,
      notes:            self.notes,
      value_before:     self.value_before.map(Brl::from_hundredths),
      value_after:      self.value_after.map(Brl::from_hundredths),
      discount:         self.discount.map(Brl::from_hundredths),
      discount_percent: self.discount_percent.map(Percent::from_hundredths),
      created_by:       decode_uuid(&self.created_by)?,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

pub const EVENT_COLUMNS: &str =
  "id, entity_type, entity_id, action, metadata, created_by, created_at";

/// Raw values read directly from an `activity_log` row.
pub struct RawEvent {
  pub id:          String,
  pub entity_type: String,
  pub entity_id:   String,
  pub action:      String,
  pub metadata:    String,
  pub created_by:  String,
  pub created_at:  String,
}

impl RawEvent {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      entity_type: row.get(1)?,
      entity_id:   row.get(2)?,
      action:      row.get(3)?,
      metadata:    row.get(4)?,
      created_by:  row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  pub fn into_event(self) -> Result<ActivityEvent> {
    let metadata: serde_json::Value = serde_json::from_str(&self.metadata)?;
    let payload = EventPayload::from_parts(&self.action, metadata)?;
    Ok(ActivityEvent {
      id: decode_uuid(&self.id)?,
      entity_type: self.entity_type,
      entity_id: decode_uuid(&self.entity_id)?,
      created_by: decode_uuid(&self.created_by)?,
      created_at: decode_dt(&self.created_at)?,
      payload,
    })
  }
}

/// Supplier links are always read joined with their supplier and revision.
pub const LINK_SELECT: &str = "
  SELECT l.id, l.proposal_id, l.revision_id, r.revision_number,
         l.supplier_id, s.legal_name, s.specialty, l.role_description,
         l.quoted_hourly_cost, l.estimated_hours, l.quoted_total,
         l.created_at
  FROM proposal_suppliers l
  JOIN suppliers s ON s.id = l.supplier_id
  LEFT JOIN proposal_revisions r ON r.id = l.revision_id";

pub struct RawSupplierLink {
  pub id:                  String,
  pub proposal_id:         String,
  pub revision_id:         Option<String>,
  pub revision_number:     Option<i64>,
  pub supplier_id:         String,
  pub supplier_legal_name: String,
  pub supplier_specialty:  String,
  pub role_description:    Option<String>,
  pub quoted_hourly_cost:  Option<i64>,
  pub estimated_hours:     Option<i64>,
  pub quoted_total:        Option<i64>,
  pub created_at:          String,
}

impl RawSupplierLink {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                  row.get(0)?,
      proposal_id:         row.get(1)?,
      revision_id:         row.get(2)?,
      revision_number:     row.get(3)?,
      supplier_id:         row.get(4)?,
      supplier_legal_name: row.get(5)?,
      supplier_specialty:  row.get(6)?,
      role_description:    row.get(7)?,
      quoted_hourly_cost:  row.get(8)?,
      estimated_hours:     row.get(9)?,
      quoted_total:        row.get(10)?,
      created_at:          row.get(11)?,
    })
  }

  pub fn into_link(self) -> Result<SupplierLink> {
    Ok(SupplierLink {
      id:                  decode_uuid(&self.id)?,
      proposal_id:         decode_uuid(&self.proposal_id)?,
      revision_id:         decode_opt_uuid(self.revision_id)?,
      revision_number:     self
        .revision_number
        .map(|n| decode_count(n, "revision_number"))
        .transpose()?,
      supplier_id:         decode_uuid(&self.supplier_id)?,
      supplier_legal_name: self.supplier_legal_name,
      supplier_specialty:  self.supplier_specialty,
      role_description:    self.role_description,
      quoted_hourly_cost:  self.quoted_hourly_cost.map(Brl::from_hundredths),
      estimated_hours:     self.estimated_hours.map(Hours::from_hundredths),
      quoted_total:        self.quoted_total.map(Brl::from_hundredths),
      created_at:          decode_dt(&self.created_at)?,
    })
  }
}

pub const ATTACHMENT_COLUMNS: &str = "id, proposal_id, revision_id, category, \
  file_name, storage_path, mime_type, size_bytes, uploaded_by, created_at";

pub struct RawAttachment {
  pub id:           String,
  pub proposal_id:  String,
  pub revision_id:  Option<String>,
  pub category:     String,
  pub file_name:    String,
  pub storage_path: String,
  pub mime_type:    String,
  pub size_bytes:   i64,
  pub uploaded_by:  String,
  pub created_at:   String,
}

impl RawAttachment {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      proposal_id:  row.get(1)?,
      revision_id:  row.get(2)?,
      category:     row.get(3)?,
      file_name:    row.get(4)?,
      storage_path: row.get(5)?,
      mime_type:    row.get(6)?,
      size_bytes:   row.get(7)?,
      uploaded_by:  row.get(8)?,
      created_at:   row.get(9)?,
    })
  }

  pub fn into_attachment(self) -> Result<Attachment> {
    Ok(Attachment {
      id:           decode_uuid(&self.id)?,
      proposal_id:  decode_uuid(&self.proposal_id)?,
      revision_id:  decode_opt_uuid(self.revision_id)?,
      category:     decode_category(&self.category)?,
      file_name:    self.file_name,
      storage_path: self.storage_path,
      mime_type:    self.mime_type,
      size_bytes:   u64::try_from(self.size_bytes).map_err(|_| {
        Error::Decode(format!("negative size_bytes: {}", self.size_bytes))
      })?,
      uploaded_by:  decode_uuid(&self.uploaded_by)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_as_strings() {
    let early = "2026-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
    let late = early + chrono::Duration::microseconds(1_500);
    assert!(encode_dt(early) < encode_dt(late));
    assert_eq!(decode_dt(&encode_dt(late)).unwrap(), late);
  }

  #[test]
  fn dates_use_iso_format() {
    let date = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
    assert_eq!(encode_date(date), "2026-02-09");
    assert_eq!(decode_date(Some("2026-02-09".into())).unwrap(), Some(date));
    assert!(decode_date(Some("09/02/2026".into())).is_err());
  }
}
