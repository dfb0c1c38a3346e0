//! Blob storage (§6, §6b): a write-only sink for receipt attachments.
//! Storage is write-once per path; the ingress never reads back what it
//! wrote. The trait boundary lives in this core; the object-store adapter
//! (S3/GCS) behind it is an external collaborator (§1) — only the
//! local-filesystem implementation below, for dev/test, ships here.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob upload failed: {0}")]
    Upload(String),
    #[error("blob upload deadline exceeded")]
    Deadline,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads `bytes` at `path`, returning a retrievable URL.
    async fn put(&self, path: &str, content_type: &str, bytes: &[u8]) -> Result<String, BlobError>;
}

/// Writes each blob under `root` at the same `path` convention a real
/// object-store adapter would use as its key, so swapping this out for S3
/// or GCS later changes no caller. `content_type` is recorded next to the
/// file as `{path}.content-type` since the filesystem has no object
/// metadata of its own.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, content_type: &str, bytes: &[u8]) -> Result<String, BlobError> {
        let full_path = self.root.join(path);
        let parent = full_path.parent().unwrap_or(Path::new(&self.root)).to_path_buf();

        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| BlobError::Upload(format!("creating {}: {e}", parent.display())))?;

        tokio::fs::write(&full_path, bytes)
            .await
            .map_err(|e| BlobError::Upload(format!("writing {}: {e}", full_path.display())))?;

        tokio::fs::write(full_path.with_extension("content-type"), content_type.as_bytes())
            .await
            .map_err(|e| BlobError::Upload(format!("writing content-type for {}: {e}", full_path.display())))?;

        Ok(format!("file://{}", full_path.display()))
    }
}

/// Replaces any character outside `[A-Za-z0-9.-]` with `_` (§6 "Blob
/// storage" path convention).
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

/// `tenants/{tenant}/receipts/{unixMs}-{sanitizedFilename}` (§6, §4.I
/// *receipts*).
pub fn receipt_blob_path(tenant_slug: &str, unix_ms: i64, filename: &str) -> String {
    format!("tenants/{tenant_slug}/receipts/{unix_ms}-{}", sanitize_filename(filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_disallowed_characters() {
        assert_eq!(sanitize_filename("invoice #42 (final).pdf"), "invoice__42__final_.pdf");
    }

    #[test]
    fn sanitize_preserves_allowed_characters() {
        assert_eq!(sanitize_filename("Invoice-2024.11.03.pdf"), "Invoice-2024.11.03.pdf");
    }

    #[test]
    fn blob_path_matches_convention() {
        let path = receipt_blob_path("acme", 1700000000000, "receipt #1.pdf");
        assert_eq!(path, "tenants/acme/receipts/1700000000000-receipt__1.pdf");
    }

    #[tokio::test]
    async fn local_store_writes_bytes_at_the_given_path() {
        let dir = std::env::temp_dir().join(format!("meridian-blob-test-{}", uuid::Uuid::new_v4()));
        let store = LocalBlobStore::new(&dir);

        let path = receipt_blob_path("acme", 1700000000000, "receipt.pdf");
        let url = store.put(&path, "application/pdf", b"%PDF-1.4 fake").await.unwrap();

        let written = tokio::fs::read(dir.join(&path)).await.unwrap();
        assert_eq!(written, b"%PDF-1.4 fake");
        assert!(url.contains(&path));

        let content_type = tokio::fs::read_to_string(dir.join(&path).with_extension("content-type")).await.unwrap();
        assert_eq!(content_type, "application/pdf");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
