//! Attachments: files stored alongside a proposal.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{document::MAX_FILE_SIZE_BYTES, error::Violation};

/// Seconds a signed download URL stays valid.
pub const DOWNLOAD_URL_TTL_SECONDS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentCategory {
  Convite,
  Tr,
  Referencia,
  /// The binding proposal document. Only written by the send and
  /// close-cycle flows.
  PropostaWord,
  PlanilhaCustos,
  Outro,
}

impl AttachmentCategory {
  pub const ALL: [Self; 6] = [
    Self::Convite,
    Self::Tr,
    Self::Referencia,
    Self::PropostaWord,
    Self::PlanilhaCustos,
    Self::Outro,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Convite => "convite",
      Self::Tr => "tr",
      Self::Referencia => "referencia",
      Self::PropostaWord => "proposta_word",
      Self::PlanilhaCustos => "planilha_custos",
      Self::Outro => "outro",
    }
  }

  pub fn is_reserved(self) -> bool { self == Self::PropostaWord }
}

impl fmt::Display for AttachmentCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for AttachmentCategory {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|c| c.as_str() == s)
      .ok_or_else(|| format!("unknown attachment category: {s:?}"))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  pub id:           Uuid,
  pub proposal_id:  Uuid,
  pub revision_id:  Option<Uuid>,
  pub category:     AttachmentCategory,
  pub file_name:    String,
  /// Unique across all attachments.
  pub storage_path: String,
  pub mime_type:    String,
  pub size_bytes:   u64,
  pub uploaded_by:  Uuid,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::ports::AttachmentRepository::create`].
#[derive(Debug, Clone)]
pub struct NewAttachment {
  pub proposal_id:  Uuid,
  pub revision_id:  Option<Uuid>,
  pub category:     AttachmentCategory,
  pub file_name:    String,
  pub storage_path: String,
  pub mime_type:    String,
  pub size_bytes:   u64,
  pub uploaded_by:  Uuid,
}

// ─── Supplementary uploads ───────────────────────────────────────────────────

const SUPPLEMENTARY_MIME_TYPES: &[&str] = &[
  "application/pdf",
  "application/msword",
  "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
  "application/vnd.ms-excel",
  "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
  "image/png",
  "image/jpeg",
  "application/zip",
  "application/acad",
  "application/x-acad",
  "application/x-autocad",
  "image/vnd.dwg",
  "application/dxf",
  "application/x-dxf",
  "image/vnd.dxf",
  "model/ifc",
];

const SUPPLEMENTARY_EXTENSIONS: &[&str] = &[
  "pdf", "doc", "docx", "xls", "xlsx", "png", "jpg", "jpeg", "zip", "dwg",
  "dxf", "rvt", "rfa", "rte", "rft", "ifc", "ifczip", "nwc", "nwd", "bcf",
  "bcfzip",
];

/// Check a non-reserved attachment: office, image, archive or CAD/BIM by MIME
/// type or extension, and within the size limit.
pub fn validate_supplementary(
  category: AttachmentCategory,
  file_name: &str,
  mime_type: &str,
  size_bytes: u64,
) -> Result<(), Violation> {
  if category.is_reserved() {
    return Err(Violation::ReservedCategory);
  }

  let mime = mime_type.trim().to_ascii_lowercase();
  let extension = file_name
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .unwrap_or_default();
  let mime_ok = !mime.is_empty() && SUPPLEMENTARY_MIME_TYPES.contains(&mime.as_str());
  let extension_ok = SUPPLEMENTARY_EXTENSIONS.contains(&extension.as_str());
  if !mime_ok && !extension_ok {
    return Err(Violation::UnsupportedFileType);
  }

  if size_bytes == 0 || size_bytes > MAX_FILE_SIZE_BYTES {
    return Err(Violation::FileSize);
  }
  Ok(())
}

/// Request a signed upload for a supplementary attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentUploadRequest {
  #[serde(default)]
  pub revision_id: Option<Uuid>,
  pub category:    AttachmentCategory,
  pub file_name:   String,
  pub mime_type:   String,
  pub size_bytes:  u64,
}

/// Record an uploaded supplementary attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeAttachment {
  #[serde(default)]
  pub revision_id:  Option<Uuid>,
  pub category:     AttachmentCategory,
  pub file_name:    String,
  pub storage_path: String,
  pub mime_type:    String,
  pub size_bytes:   u64,
}

/// A time-limited URL to fetch an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadUrl {
  pub signed_url:         String,
  pub expires_in_seconds: u64,
}

/// The outcome of deleting an attachment row. The object at `storage_path`
/// is left for the caller to remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedAttachment {
  pub attachment_id: Uuid,
  pub proposal_id:   Uuid,
  pub storage_path:  String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn proposta_word_is_reserved() {
    assert_eq!(
      validate_supplementary(
        AttachmentCategory::PropostaWord,
        "a.pdf",
        "application/pdf",
        10
      ),
      Err(Violation::ReservedCategory)
    );
  }

  #[test]
  fn mime_or_extension_is_enough() {
    let cat = AttachmentCategory::Referencia;
    assert!(validate_supplementary(cat, "model.rvt", "", 10).is_ok());
    assert!(
      validate_supplementary(cat, "no-extension", " IMAGE/PNG ", 10).is_ok()
    );
    assert_eq!(
      validate_supplementary(cat, "script.exe", "application/x-msdownload", 10),
      Err(Violation::UnsupportedFileType)
    );
  }

  #[test]
  fn size_limit_applies() {
    let cat = AttachmentCategory::Tr;
    assert_eq!(
      validate_supplementary(cat, "tr.pdf", "application/pdf", 0),
      Err(Violation::FileSize)
    );
    assert_eq!(
      validate_supplementary(
        cat,
        "tr.pdf",
        "application/pdf",
        MAX_FILE_SIZE_BYTES + 1
      ),
      Err(Violation::FileSize)
    );
  }

  #[test]
  fn category_strings_round_trip() {
    for category in AttachmentCategory::ALL {
      assert_eq!(category.as_str().parse(), Ok(category));
    }
  }
}
