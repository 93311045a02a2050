//! Document blob storage.
//!
//! The pipeline only needs `put` and `exists`; concrete backends (local
//! filesystem in the server crate, in-memory here for tests) implement
//! [`DocumentStore`].

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use dashmap::DashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write `bytes` under `key`. Overwrites are allowed; the deduplicator
    /// guarantees each logical event writes at most once.
    async fn put(&self, key: &str, bytes: &[u8], mime: &str) -> Result<(), StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Storage key for a document: tenant-scoped, partitioned by receipt month.
pub fn build_document_key(
    company_id: i64,
    document_id: &str,
    file_name: &str,
    received_at: DateTime<Utc>,
) -> String {
    format!(
        "companies/{}/documents/{}/{:02}/{}/{}",
        company_id,
        received_at.year(),
        received_at.month(),
        document_id,
        file_name
    )
}

/// In-memory store used by unit and pipeline tests.
#[derive(Default)]
pub struct MemoryDocumentStore {
    objects: DashMap<String, (Vec<u8>, String)>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects.get(key).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(&self, key: &str, bytes: &[u8], mime: &str) -> Result<(), StorageError> {
        self.objects
            .insert(key.to_string(), (bytes.to_vec(), mime.to_string()));
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn document_keys_are_tenant_and_month_scoped() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        let key = build_document_key(42, "doc-abc", "invoice.pdf", at);
        assert_eq!(key, "companies/42/documents/2024/03/doc-abc/invoice.pdf");
    }

    #[tokio::test]
    async fn memory_store_round_trips() {
        let store = MemoryDocumentStore::new();
        store
            .put("companies/1/documents/2024/03/d/a.pdf", b"%PDF", "application/pdf")
            .await
            .unwrap();
        assert!(store
            .exists("companies/1/documents/2024/03/d/a.pdf")
            .await
            .unwrap());
        assert!(!store.exists("companies/1/x").await.unwrap());
        let (bytes, mime) = store.get("companies/1/documents/2024/03/d/a.pdf").unwrap();
        assert_eq!(bytes, b"%PDF");
        assert_eq!(mime, "application/pdf");
    }
}
