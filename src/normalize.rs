//! Payload-shape resolution: canonical nested metadata vs. legacy flat fields.
//!
//! Older engine workflows put extraction results directly at the top level of
//! the payload; current ones nest them under `extracted`. The two shapes are
//! reconciled exactly once, here, into a tagged [`MetadataSource`]; the rest
//! of the pipeline never does field-presence sniffing of its own.

use serde_json::{Map, Value};

use crate::error::IngestError;

/// Top-level field names honored when no canonical `extracted` object is
/// present. Anything else at the top level is ignored.
pub const LEGACY_FIELDS: [&str; 13] = [
    "vendor",
    "doc_date",
    "amount_total",
    "amount_net",
    "amount_tax",
    "currency",
    "doc_number",
    "title",
    "summary",
    "keywords",
    "line_items",
    "compliance_flags",
    "sha256",
];

/// Where a delivery's metadata came from. All-canonical or all-legacy, never
/// a field-by-field blend.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataSource {
    /// The nested `extracted` object, used verbatim; same-named top-level
    /// fields are discarded unconditionally.
    Canonical(Map<String, Value>),
    /// Recognized top-level fields from the older payload shape.
    Legacy(Map<String, Value>),
    /// The delivery carries no metadata at all.
    Absent,
}

impl MetadataSource {
    /// The field map to validate, if any survived resolution.
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match self {
            MetadataSource::Canonical(map) | MetadataSource::Legacy(map) => Some(map),
            MetadataSource::Absent => None,
        }
    }
}

/// Resolve which shape a payload carries.
///
/// An explicit `"extracted": null` means the sender opted out of the canonical
/// shape, so the legacy scan still runs; any other non-object value is a
/// malformed canonical object and rejects the event.
pub fn resolve_metadata(body: &Map<String, Value>) -> Result<MetadataSource, IngestError> {
    match body.get("extracted") {
        Some(Value::Object(map)) => {
            if map.is_empty() {
                Ok(MetadataSource::Absent)
            } else {
                Ok(MetadataSource::Canonical(map.clone()))
            }
        }
        Some(Value::Null) | None => Ok(scan_legacy(body)),
        Some(_) => Err(IngestError::InvalidExtractionField {
            field: "extracted".into(),
            reason: "must be an object".into(),
        }),
    }
}

fn scan_legacy(body: &Map<String, Value>) -> MetadataSource {
    let mut fields = Map::new();
    for key in LEGACY_FIELDS {
        let Some(value) = body.get(key) else { continue };
        match value {
            Value::Null => {}
            Value::String(s) if s.trim().is_empty() => {}
            other => {
                fields.insert(key.to_string(), other.clone());
            }
        }
    }
    if fields.is_empty() {
        MetadataSource::Absent
    } else {
        MetadataSource::Legacy(fields)
    }
}
