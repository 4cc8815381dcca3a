//! Filesystem-backed [`ObjectStorage`] with signed URLs.
//!
//! Objects live under a root directory at their storage path. A signed URL
//! carries an expiry and a token
//! `hex(sha256(secret \n access \n path \n expires))`; the server's object
//! routes accept a request only while the token matches and has not expired.

use std::{
  io,
  path::{Component, Path, PathBuf},
};

use chrono::Utc;
use proposta_core::{document::SignedUpload, ports::ObjectStorage};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq as _;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectError {
  #[error("invalid object path: {0:?}")]
  InvalidPath(String),

  #[error("io error: {0}")]
  Io(#[from] io::Error),
}

/// What a signed URL allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
  Upload,
  Download,
}

impl Access {
  fn as_str(self) -> &'static str {
    match self {
      Self::Upload => "upload",
      Self::Download => "download",
    }
  }
}

pub struct FsObjectStore {
  root:               PathBuf,
  public_base_url:    String,
  secret:             String,
  upload_ttl_seconds: u64,
}

impl FsObjectStore {
  pub fn new(
    root: impl Into<PathBuf>,
    public_base_url: impl Into<String>,
    secret: impl Into<String>,
    upload_ttl_seconds: u64,
  ) -> Self {
    Self {
      root: root.into(),
      public_base_url: public_base_url.into().trim_end_matches('/').to_owned(),
      secret: secret.into(),
      upload_ttl_seconds,
    }
  }

  /// Map a storage path onto the filesystem. Only plain relative components
  /// are accepted.
  pub fn resolve(&self, path: &str) -> Result<PathBuf, ObjectError> {
    let invalid = || ObjectError::InvalidPath(path.to_owned());
    if path.is_empty() || path.contains('\\') {
      return Err(invalid());
    }
    let relative = Path::new(path);
    if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
      return Err(invalid());
    }
    Ok(self.root.join(relative))
  }

  pub fn sign(&self, access: Access, path: &str, expires: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.secret.as_bytes());
    hasher.update(b"\n");
    hasher.update(access.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(path.as_bytes());
    hasher.update(b"\n");
    hasher.update(expires.to_string().as_bytes());
    hex::encode(hasher.finalize())
  }

  /// Whether `token` grants `access` to `path` right now. Tokens are compared
  /// in constant time.
  pub fn verify(&self, access: Access, path: &str, expires: i64, token: &str) -> bool {
    let expected = self.sign(access, path, expires);
    let matches: bool = expected.as_bytes().ct_eq(token.as_bytes()).into();
    matches && expires >= Utc::now().timestamp()
  }

  fn signed_url(&self, path: &str, expires: i64, token: &str) -> String {
    format!(
      "{}/objects/{path}?expires={expires}&token={token}",
      self.public_base_url
    )
  }

  fn expiry(seconds: u64) -> i64 {
    Utc::now()
      .timestamp()
      .saturating_add(i64::try_from(seconds).unwrap_or(i64::MAX))
  }

  pub async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ObjectError> {
    let target = self.resolve(path)?;
    if let Some(parent) = target.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(target, bytes).await?;
    Ok(())
  }

  pub async fn read(&self, path: &str) -> Result<Vec<u8>, ObjectError> {
    Ok(tokio::fs::read(self.resolve(path)?).await?)
  }

  /// Remove an object; a missing object is not an error.
  pub async fn remove(&self, path: &str) -> Result<(), ObjectError> {
    match tokio::fs::remove_file(self.resolve(path)?).await {
      Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
      _ => Ok(()),
    }
  }
}

impl ObjectStorage for FsObjectStore {
  fn object_exists(&self, path: &str) -> proposta_core::Result<bool> {
    Ok(self.resolve(path).is_ok_and(|target| target.is_file()))
  }

  fn create_signed_upload_url(&self, path: &str) -> proposta_core::Result<SignedUpload> {
    self.resolve(path).map_err(proposta_core::Error::store)?;
    let expires = Self::expiry(self.upload_ttl_seconds);
    let token = self.sign(Access::Upload, path, expires);
    Ok(SignedUpload {
      path:       path.to_owned(),
      signed_url: self.signed_url(path, expires, &token),
      token,
    })
  }

  fn create_signed_download_url(
    &self,
    path: &str,
    expires_in_seconds: u64,
  ) -> proposta_core::Result<String> {
    self.resolve(path).map_err(proposta_core::Error::store)?;
    let expires = Self::expiry(expires_in_seconds);
    let token = self.sign(Access::Download, path, expires);
    Ok(self.signed_url(path, expires, &token))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn store(root: &Path) -> FsObjectStore {
    FsObjectStore::new(root, "http://localhost:8080/", "secret", 600)
  }

  #[test]
  fn rejects_paths_outside_root() {
    let dir = tempfile::tempdir().unwrap();
    let objects = store(dir.path());
    assert!(objects.resolve("a/b/c.pdf").is_ok());
    for bad in ["", "/etc/passwd", "a/../../b", "./a", "a\\b"] {
      assert!(objects.resolve(bad).is_err(), "{bad:?} should be rejected");
    }
  }

  #[test]
  fn tokens_are_bound_to_access_path_and_expiry() {
    let dir = tempfile::tempdir().unwrap();
    let objects = store(dir.path());
    let expires = Utc::now().timestamp() + 60;
    let token = objects.sign(Access::Upload, "a/b.pdf", expires);

    assert!(objects.verify(Access::Upload, "a/b.pdf", expires, &token));
    assert!(!objects.verify(Access::Download, "a/b.pdf", expires, &token));
    assert!(!objects.verify(Access::Upload, "a/c.pdf", expires, &token));
    assert!(!objects.verify(Access::Upload, "a/b.pdf", expires + 1, &token));

    assert!(!objects.verify(Access::Upload, "a/b.pdf", expires, &token[..10]));
    assert!(!objects.verify(Access::Upload, "a/b.pdf", expires, ""));

    let past = Utc::now().timestamp() - 1;
    let stale = objects.sign(Access::Upload, "a/b.pdf", past);
    assert!(!objects.verify(Access::Upload, "a/b.pdf", past, &stale));
  }

  #[test]
  fn signed_upload_points_at_object_route() {
    let dir = tempfile::tempdir().unwrap();
    let objects = store(dir.path());
    let upload = objects.create_signed_upload_url("x/y.pdf").unwrap();
    assert_eq!(upload.path, "x/y.pdf");
    assert!(upload.signed_url.starts_with("http://localhost:8080/objects/x/y.pdf?expires="));
    assert!(upload.signed_url.ends_with(&format!("&token={}", upload.token)));
  }

  #[tokio::test]
  async fn write_read_remove() {
    let dir = tempfile::tempdir().unwrap();
    let objects = store(dir.path());
    assert!(!objects.object_exists("p/r0/doc.pdf").unwrap());

    objects.write("p/r0/doc.pdf", b"%PDF").await.unwrap();
    assert!(objects.object_exists("p/r0/doc.pdf").unwrap());
    assert_eq!(objects.read("p/r0/doc.pdf").await.unwrap(), b"%PDF");

    objects.remove("p/r0/doc.pdf").await.unwrap();
    objects.remove("p/r0/doc.pdf").await.unwrap();
    assert!(!objects.object_exists("p/r0/doc.pdf").unwrap());
  }
}
