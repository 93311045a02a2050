//! Core data types for the webhook ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IngestError;

/// One raw webhook delivery as it arrives off the wire: the exact body bytes
/// (the HMAC input) plus the protocol headers, already trimmed.
///
/// Header values are borrowed; the struct is a cheap view the HTTP layer
/// assembles per request.
#[derive(Debug, Clone, Copy)]
pub struct WebhookDelivery<'a> {
    /// Raw request body, exactly as signed by the sender.
    pub raw_body: &'a [u8],
    /// `X-Timestamp` header (Unix seconds).
    pub timestamp: Option<&'a str>,
    /// `X-Signature` header (hex HMAC-SHA256), canonical scheme.
    pub signature: Option<&'a str>,
    /// `X-Secret-Header` value, legacy pre-shared-secret scheme.
    pub shared_secret: Option<&'a str>,
    /// `X-Event-Id` header; wins over any body `event_id`.
    pub event_id: Option<&'a str>,
}

/// Parse the delivery body into a JSON object map.
pub fn parse_body(raw: &[u8]) -> Result<Map<String, Value>, IngestError> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|err| IngestError::MalformedPayload(format!("invalid JSON: {err}")))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(IngestError::MalformedPayload(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Extract and coerce the required `company_id` field. Integers and integer
/// strings are accepted; anything else is malformed.
pub fn company_id_of(body: &Map<String, Value>) -> Result<i64, IngestError> {
    match body.get("company_id") {
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| IngestError::MalformedPayload("company_id must be an integer".into())),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| IngestError::MalformedPayload("company_id must be an integer".into())),
        Some(_) => Err(IngestError::MalformedPayload(
            "company_id must be an integer".into(),
        )),
        None => Err(IngestError::MalformedPayload(
            "missing required field company_id".into(),
        )),
    }
}

/// Resolve the event id: header value wins over the body field.
pub fn resolve_event_id(
    header: Option<&str>,
    body: &Map<String, Value>,
) -> Result<String, IngestError> {
    if let Some(id) = header.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }
    match body.get("event_id") {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::Null) | None => Err(IngestError::MissingEventId),
        Some(Value::String(_)) => Err(IngestError::MissingEventId),
        Some(_) => Err(IngestError::MalformedPayload(
            "event_id must be a string".into(),
        )),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One invoice line item inside an [`ExtractionRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    /// Decimal-as-string, same convention as the `amount_*` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

/// A compliance finding reported by the extraction engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComplianceFlag {
    pub code: String,
    pub severity: String,
}

/// Normalized metadata attached to a stored document.
///
/// Assembled once by the normalizer from either the canonical nested object or
/// the legacy flat fields, never a blend, and immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// ISO `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_number: Option<String>,
    /// Decimal-as-string with exactly two fractional digits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_total: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_net: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_tax: Option<String>,
    /// Exactly three characters, uppercased.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Sender-computed digest of the file, 64 hex chars. Trusted when present
    /// and well-formed, recomputed otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compliance_flags: Vec<ComplianceFlag>,
}

impl ExtractionRecord {
    /// True when no field survived validation; such records are dropped
    /// entirely rather than stored as empty shells.
    pub fn is_empty(&self) -> bool {
        self.vendor.is_none()
            && self.doc_date.is_none()
            && self.doc_number.is_none()
            && self.amount_total.is_none()
            && self.amount_net.is_none()
            && self.amount_tax.is_none()
            && self.currency.is_none()
            && self.title.is_none()
            && self.summary.is_none()
            && self.sha256.is_none()
            && self.keywords.is_empty()
            && self.line_items.is_empty()
            && self.compliance_flags.is_empty()
    }

    /// Display title for the stored document: `vendor - date - amount CUR`,
    /// falling back to the file stem when no parts are present.
    pub fn display_title(&self, fallback_filename: &str) -> String {
        if let Some(title) = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            return title.to_string();
        }
        let mut parts: Vec<String> = Vec::new();
        if let Some(vendor) = self.vendor.as_deref() {
            parts.push(vendor.to_string());
        }
        if let Some(date) = self.doc_date.as_deref() {
            parts.push(date.to_string());
        }
        if let Some(amount) = self.amount_total.as_deref() {
            match self.currency.as_deref() {
                Some(cur) => parts.push(format!("{amount} {cur}")),
                None => parts.push(amount.to_string()),
            }
        }
        if !parts.is_empty() {
            return parts.join(" - ");
        }
        file_stem(fallback_filename)
    }
}

pub(crate) fn file_stem(filename: &str) -> String {
    let base = filename.trim();
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem.to_string()
    }
}

/// Decoded and validated file payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub bytes: Vec<u8>,
    /// Inferred MIME type: data-URI prefix wins over the filename extension.
    pub mime: String,
}

impl StoredFile {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Audit record for a successfully stored document, handed back to the HTTP
/// layer and to storage bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub document_id: String,
    pub company_id: i64,
    pub event_id: String,
    pub file_name: String,
    pub mime: String,
    pub size: usize,
    pub sha256: String,
    pub storage_key: String,
    pub title: String,
    pub received_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionRecord>,
}

/// Terminal pipeline result for one delivery.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// The document was written and the event finalized.
    Stored(DocumentRecord),
    /// The event was already processed; `document_id` points at the original
    /// document so retries stay idempotent.
    Duplicate { document_id: String },
}
