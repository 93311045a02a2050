//! Document-ingestion webhook pipeline.
//!
//! This crate implements the tenant-facing half of the ingestion service:
//! authenticating a webhook delivery, deduplicating it by logical event,
//! validating the carried file and metadata, and handing a normalized
//! document record to a storage backend. The HTTP surface lives in the
//! `docgate-server` crate; everything here is transport-agnostic.
//!
//! Processing order is fixed: signature, then dedup reservation, then
//! payload normalization, content validation, field validation, storage
//! write, and finally the reservation is marked processed. Any failure
//! after the reservation releases it so the sender can retry.

pub mod config;
pub mod content;
pub mod dedup;
pub mod error;
pub mod fields;
pub mod normalize;
pub mod signature;
pub mod storage;
pub mod types;

pub use config::IngestConfig;
pub use dedup::{EventLedger, MemoryEventLedger, Reservation};
pub use error::IngestError;
pub use normalize::MetadataSource;
pub use signature::{TenantDirectory, TenantSecret};
pub use storage::{DocumentStore, MemoryDocumentStore, StorageError};
pub use types::{
    DocumentRecord, ExtractionRecord, IngestOutcome, StoredFile, WebhookDelivery,
};

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// End-to-end webhook processor. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct IngestPipeline {
    config: IngestConfig,
    ledger: Arc<dyn EventLedger>,
    store: Arc<dyn DocumentStore>,
}

impl IngestPipeline {
    pub fn new(
        config: IngestConfig,
        ledger: Arc<dyn EventLedger>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            config,
            ledger,
            store,
        }
    }

    /// Process one webhook delivery.
    ///
    /// The raw body bytes are authenticated before the parsed JSON is
    /// trusted for anything beyond route identity (tenant and event id).
    pub async fn process(
        &self,
        delivery: WebhookDelivery<'_>,
        directory: &dyn TenantDirectory,
    ) -> Result<IngestOutcome, IngestError> {
        let body = types::parse_body(delivery.raw_body)?;
        let company_id = types::company_id_of(&body)?;
        let event_id = types::resolve_event_id(delivery.event_id, &body)?;

        let tenant = directory
            .webhook_secret(company_id)
            .ok_or(IngestError::UnknownCompany(company_id))?;
        if !tenant.enabled || tenant.secret.is_empty() {
            return Err(IngestError::AuthenticationFailed(
                "webhook ingestion disabled for this company".into(),
            ));
        }
        signature::verify(
            &delivery,
            &tenant.secret,
            Utc::now().timestamp(),
            &self.config,
        )?;

        match self.ledger.reserve(company_id, &event_id) {
            Reservation::AlreadyProcessed { document_id } => {
                tracing::info!(company_id, event_id = %event_id, document_id = %document_id,
                    "duplicate delivery, returning original document");
                return Ok(IngestOutcome::Duplicate { document_id });
            }
            Reservation::AlreadyReserved => {
                return Err(IngestError::AlreadyReserved {
                    company_id,
                    event_id,
                });
            }
            Reservation::Reserved => {}
        }

        match self.run_reserved(company_id, &event_id, &body).await {
            Ok(record) => {
                self.ledger
                    .finalize(company_id, &event_id, &record.document_id);
                Ok(IngestOutcome::Stored(record))
            }
            Err(err) => {
                self.ledger.release(company_id, &event_id);
                Err(err)
            }
        }
    }

    /// Validation and storage once the event is reserved. Every error path
    /// out of here must be followed by a ledger release.
    async fn run_reserved(
        &self,
        company_id: i64,
        event_id: &str,
        body: &Map<String, Value>,
    ) -> Result<DocumentRecord, IngestError> {
        let source = normalize::resolve_metadata(body)?;

        let file_base64 = match body.get("file_base64") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.as_str(),
            Some(Value::Null) | None => {
                return Err(IngestError::MalformedPayload(
                    "missing required field: file_base64".into(),
                ))
            }
            Some(_) => {
                return Err(IngestError::MalformedPayload(
                    "file_base64 must be a non-empty string".into(),
                ))
            }
        };
        let supplied_name = body
            .get("file_name")
            .or_else(|| body.get("filename"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty());

        let file = content::validate_content(file_base64, supplied_name, event_id, &self.config)?;

        // Metadata fields are only validated once the file itself is known
        // good; a delivery broken in both ways reports the content error.
        let extraction = match source.fields() {
            Some(fields) => {
                let record = fields::validate_record(fields)?;
                if record.is_empty() {
                    None
                } else {
                    Some(record)
                }
            }
            None => None,
        };

        let file_name = match supplied_name {
            Some(name) => content::safe_filename(name),
            None => content::default_file_name(event_id, &file.mime),
        };

        let sha256 = match extraction.as_ref().and_then(|r| r.sha256.clone()) {
            Some(declared) => declared,
            None => hex::encode(Sha256::digest(&file.bytes)),
        };

        let document_id = uuid::Uuid::new_v4().to_string();
        let received_at = Utc::now();
        let storage_key =
            storage::build_document_key(company_id, &document_id, &file_name, received_at);
        let title = match extraction.as_ref() {
            Some(record) => record.display_title(&file_name),
            None => types::file_stem(&file_name),
        };

        self.store
            .put(&storage_key, &file.bytes, &file.mime)
            .await
            .map_err(|err| IngestError::StorageWriteFailed(err.to_string()))?;

        tracing::info!(company_id, event_id = %event_id, document_id = %document_id,
            size = file.len(), mime = %file.mime, "document stored");

        Ok(DocumentRecord {
            document_id,
            company_id,
            event_id: event_id.to_string(),
            file_name,
            mime: file.mime,
            size: file.bytes.len(),
            sha256,
            storage_key,
            title,
            received_at,
            extraction,
        })
    }
}
