//! Proposal document rules and canonical storage paths.
//!
//! The binding proposal document of revision `N` must be a DOC, DOCX or PDF
//! whose name carries the proposal code and the token `R{N}`, stored under
//!
//! ```text
//! {customerSlug}/{year}/{proposalCode}/revisions/R{N}/{category}/{uuid}_{safeName}
//! ```

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  attachment::AttachmentCategory,
  error::Violation,
  proposal::{StorageContext, strip_diacritics},
};

/// 50 MiB.
pub const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;

const DOCUMENT_EXTENSIONS: &[&str] = &[".doc", ".docx", ".pdf"];

const DOCUMENT_MIME_TYPES: &[&str] = &[
  "application/msword",
  "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
  "application/pdf",
];

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// A file the caller intends to upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRequest {
  pub file_name:  String,
  pub mime_type:  String,
  pub size_bytes: u64,
}

/// A file the caller has already uploaded to `storage_path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUpload {
  pub file_name:    String,
  pub storage_path: String,
  pub mime_type:    String,
  pub size_bytes:   u64,
}

impl DocumentUpload {
  pub fn request(&self) -> DocumentRequest {
    DocumentRequest {
      file_name:  self.file_name.clone(),
      mime_type:  self.mime_type.clone(),
      size_bytes: self.size_bytes,
    }
  }
}

/// Input to send a proposal together with its document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendWithFile {
  pub document:    DocumentUpload,
  #[serde(default)]
  pub status_date: Option<NaiveDate>,
}

/// A storage location the client may upload to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUpload {
  pub path:       String,
  pub token:      String,
  pub signed_url: String,
}

/// A signed upload for a proposal document, plus the revision it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentUploadTicket {
  #[serde(flatten)]
  pub upload:          SignedUpload,
  pub revision_number: u32,
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// Extension, MIME type and size, in that order.
pub fn validate_document_format(doc: &DocumentRequest) -> Result<(), Violation> {
  let name = doc.file_name.trim().to_lowercase();
  if !DOCUMENT_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
    return Err(Violation::DocumentExtension);
  }
  if !DOCUMENT_MIME_TYPES.contains(&doc.mime_type.as_str()) {
    return Err(Violation::DocumentMimeType);
  }
  if doc.size_bytes == 0 || doc.size_bytes > MAX_FILE_SIZE_BYTES {
    return Err(Violation::FileSize);
  }
  Ok(())
}

/// The lower-cased name must contain the proposal code and `r{N}`.
pub fn validate_document_name(
  proposal_code: &str,
  revision_number: u32,
  file_name: &str,
) -> Result<(), Violation> {
  let name = file_name.to_lowercase();
  let token = format!("r{revision_number}");
  if !name.contains(&proposal_code.to_lowercase()) || !name.contains(&token) {
    return Err(Violation::DocumentName { revision_number });
  }
  Ok(())
}

/// Strip diacritics and replace everything outside `[A-Za-z0-9._-]` with `_`.
pub fn safe_file_name(file_name: &str) -> String {
  strip_diacritics(file_name)
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
        c
      } else {
        '_'
      }
    })
    .collect()
}

// ─── StoragePath ─────────────────────────────────────────────────────────────

/// A parsed canonical storage path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath {
  pub customer_slug:   String,
  pub year:            i32,
  pub proposal_code:   String,
  pub revision_number: u32,
  pub category:        AttachmentCategory,
  /// The last segment, `{uuid}_{safeName}`.
  pub file_name:       String,
}

impl StoragePath {
  /// Build a fresh path for `file_name` with a new unique prefix.
  pub fn new(
    ctx: &StorageContext,
    revision_number: u32,
    category: AttachmentCategory,
    file_name: &str,
  ) -> Self {
    Self {
      customer_slug: ctx.customer_slug.clone(),
      year: ctx.year,
      proposal_code: ctx.proposal_code.clone(),
      revision_number,
      category,
      file_name: format!("{}_{}", Uuid::new_v4(), safe_file_name(file_name)),
    }
  }

  /// Whether this path is the given proposal's revision folder for
  /// `category`.
  pub fn belongs_to(
    &self,
    ctx: &StorageContext,
    revision_number: u32,
    category: AttachmentCategory,
  ) -> bool {
    self.customer_slug == ctx.customer_slug
      && self.year == ctx.year
      && self.proposal_code == ctx.proposal_code
      && self.revision_number == revision_number
      && self.category == category
  }

  /// Ensure `path` is a canonical path inside the given revision folder.
  pub fn ensure_matches(
    path: &str,
    ctx: &StorageContext,
    revision_number: u32,
    category: AttachmentCategory,
  ) -> Result<Self, Violation> {
    path
      .parse::<Self>()
      .ok()
      .filter(|parsed| parsed.belongs_to(ctx, revision_number, category))
      .ok_or(Violation::StoragePathMismatch)
  }
}

impl fmt::Display for StoragePath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}/{}/{}/revisions/R{}/{}/{}",
      self.customer_slug,
      self.year,
      self.proposal_code,
      self.revision_number,
      self.category,
      self.file_name
    )
  }
}

impl FromStr for StoragePath {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let segments: Vec<&str> = s.split('/').collect();
    let [slug, year, code, revisions, revision, category, file_name] =
      segments.as_slice()
    else {
      return Err(format!("storage path must have 7 segments: {s:?}"));
    };
    if *revisions != "revisions" {
      return Err(format!("missing revisions segment: {s:?}"));
    }
    if slug.is_empty() || code.is_empty() || file_name.is_empty() {
      return Err(format!("empty segment in storage path: {s:?}"));
    }
    let year = year
      .parse()
      .map_err(|_| format!("invalid year in storage path: {s:?}"))?;
    let revision_number = revision
      .strip_prefix('R')
      .and_then(|n| n.parse().ok())
      .ok_or_else(|| format!("invalid revision folder in storage path: {s:?}"))?;
    let category = category.parse()?;

    Ok(Self {
      customer_slug: (*slug).to_owned(),
      year,
      proposal_code: (*code).to_owned(),
      revision_number,
      category,
      file_name: (*file_name).to_owned(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const CODE: &str = "BV-EGIS-2026-BIM-001";

  fn ctx() -> StorageContext {
    StorageContext {
      proposal_id:   Uuid::nil(),
      proposal_code: CODE.into(),
      year:          2026,
      customer_slug: "egis".into(),
    }
  }

  fn pdf(name: &str) -> DocumentRequest {
    DocumentRequest {
      file_name:  name.into(),
      mime_type:  "application/pdf".into(),
      size_bytes: 1024,
    }
  }

  #[test]
  fn accepts_named_revision_document() {
    let doc = pdf("BV-EGIS-2026-BIM-001-R3.pdf");
    assert!(validate_document_format(&doc).is_ok());
    assert!(validate_document_name(CODE, 3, &doc.file_name).is_ok());

    let path = StoragePath::new(
      &ctx(),
      3,
      AttachmentCategory::PropostaWord,
      &doc.file_name,
    )
    .to_string();
    assert!(path.starts_with("egis/2026/BV-EGIS-2026-BIM-001/revisions/R3/"));
    assert!(path.ends_with("_BV-EGIS-2026-BIM-001-R3.pdf"));
    let prefix = path
      .rsplit('/')
      .next()
      .and_then(|last| last.split_once('_'))
      .map(|(uuid, _)| uuid)
      .unwrap();
    assert!(Uuid::parse_str(prefix).is_ok());
    assert!(path.contains("/revisions/R3/proposta_word/"));
  }

  #[test]
  fn rejects_name_without_revision_token() {
    assert_eq!(
      validate_document_name(CODE, 4, "BV-EGIS-2026-BIM-001-R3.pdf"),
      Err(Violation::DocumentName { revision_number: 4 })
    );
    assert_eq!(
      validate_document_name(CODE, 1, "proposta-r1.pdf"),
      Err(Violation::DocumentName { revision_number: 1 })
    );
  }

  #[test]
  fn format_rules_apply_in_order() {
    assert_eq!(
      validate_document_format(&pdf("proposta.txt")),
      Err(Violation::DocumentExtension)
    );

    let mut wrong_mime = pdf(" Proposta.PDF ");
    wrong_mime.mime_type = "text/plain".into();
    assert_eq!(
      validate_document_format(&wrong_mime),
      Err(Violation::DocumentMimeType)
    );

    let mut empty = pdf("p.docx");
    empty.mime_type = DOCUMENT_MIME_TYPES[1].into();
    empty.size_bytes = 0;
    assert_eq!(validate_document_format(&empty), Err(Violation::FileSize));

    let mut huge = pdf("p.doc");
    huge.size_bytes = MAX_FILE_SIZE_BYTES + 1;
    assert_eq!(validate_document_format(&huge), Err(Violation::FileSize));

    let mut limit = pdf("p.pdf");
    limit.size_bytes = MAX_FILE_SIZE_BYTES;
    assert!(validate_document_format(&limit).is_ok());
  }

  #[test]
  fn safe_name_replaces_unsafe_chars() {
    assert_eq!(safe_file_name("Proposta Revisão (final).pdf"), "Proposta_Revisao__final_.pdf");
  }

  #[test]
  fn built_path_parses_back() {
    let built = StoragePath::new(&ctx(), 2, AttachmentCategory::Tr, "termo.pdf");
    let parsed: StoragePath = built.to_string().parse().unwrap();
    assert_eq!(parsed, built);
    assert_eq!(parsed.customer_slug, "egis");
    assert_eq!(parsed.year, 2026);
    assert_eq!(parsed.proposal_code, CODE);
    assert_eq!(parsed.revision_number, 2);
    assert_eq!(parsed.category, AttachmentCategory::Tr);
  }

  #[test]
  fn rejects_non_canonical_paths() {
    for bad in [
      "egis/2026/BV-EGIS-2026-BIM-001/R3/proposta_word/x.pdf",
      "egis/2026/BV-EGIS-2026-BIM-001/revisions/3/proposta_word/x.pdf",
      "egis/20x6/BV-EGIS-2026-BIM-001/revisions/R3/proposta_word/x.pdf",
      "egis/2026/BV-EGIS-2026-BIM-001/revisions/R3/unknown/x.pdf",
      "egis/2026/BV-EGIS-2026-BIM-001/revisions/R3/proposta_word/",
    ] {
      assert!(bad.parse::<StoragePath>().is_err(), "{bad}");
    }
  }

  #[test]
  fn ensure_matches_checks_revision_and_category() {
    let path = StoragePath::new(
      &ctx(),
      3,
      AttachmentCategory::PropostaWord,
      "BV-EGIS-2026-BIM-001-R3.pdf",
    )
    .to_string();
    assert!(
      StoragePath::ensure_matches(&path, &ctx(), 3, AttachmentCategory::PropostaWord)
        .is_ok()
    );
    assert_eq!(
      StoragePath::ensure_matches(&path, &ctx(), 4, AttachmentCategory::PropostaWord),
      Err(Violation::StoragePathMismatch)
    );
    assert_eq!(
      StoragePath::ensure_matches(&path, &ctx(), 3, AttachmentCategory::Outro),
      Err(Violation::StoragePathMismatch)
    );
  }
}
