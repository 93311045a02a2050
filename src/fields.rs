//! Per-field validation and normalization of extracted metadata.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::IngestError;
use crate::types::{ComplianceFlag, ExtractionRecord, LineItem};

/// Validate a raw metadata map field by field, returning the normalized
/// record. Unknown keys are ignored; any recognized key with an invalid
/// value rejects the whole event.
pub fn validate_record(fields: &Map<String, Value>) -> Result<ExtractionRecord, IngestError> {
    let record = ExtractionRecord {
        vendor: optional_str(fields, "vendor")?,
        doc_date: doc_date(fields)?,
        doc_number: optional_str(fields, "doc_number")?,
        amount_total: amount(fields, "amount_total")?,
        amount_net: amount(fields, "amount_net")?,
        amount_tax: amount(fields, "amount_tax")?,
        currency: currency(fields)?,
        title: optional_str(fields, "title")?,
        summary: optional_str(fields, "summary")?,
        sha256: sha256(fields)?,
        keywords: keywords(fields)?,
        line_items: typed_list::<LineItem>(fields, "line_items")?,
        compliance_flags: typed_list::<ComplianceFlag>(fields, "compliance_flags")?,
    };
    Ok(record)
}

/// A present key must hold a string; the trimmed value is kept, empty
/// strings collapse to `None`. Explicit nulls are treated as absent.
fn optional_str(fields: &Map<String, Value>, key: &str) -> Result<Option<String>, IngestError> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Some(other) => Err(IngestError::InvalidExtractionField {
            field: key.to_string(),
            reason: format!("expected a string, got {}", type_name(other)),
        }),
    }
}

fn doc_date(fields: &Map<String, Value>) -> Result<Option<String>, IngestError> {
    let Some(raw) = optional_str(fields, "doc_date")? else {
        return Ok(None);
    };
    if !is_iso_date_shape(&raw) {
        return Err(IngestError::InvalidExtractionField {
            field: "doc_date".into(),
            reason: format!("{raw:?} is not in YYYY-MM-DD form"),
        });
    }
    if NaiveDate::parse_from_str(&raw, "%Y-%m-%d").is_err() {
        return Err(IngestError::InvalidExtractionField {
            field: "doc_date".into(),
            reason: format!("{raw:?} is not a valid calendar date"),
        });
    }
    Ok(Some(raw))
}

/// Exactly `YYYY-MM-DD`, all ASCII digits. Chrono alone would accept
/// variants like `2024-1-5`.
fn is_iso_date_shape(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[8..].iter().all(u8::is_ascii_digit)
}

/// Amounts are decimal strings with exactly two fractional digits,
/// optionally negative. Numeric JSON values are rejected rather than
/// coerced; formatting them would silently change the payload.
fn amount(fields: &Map<String, Value>, key: &str) -> Result<Option<String>, IngestError> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if !is_amount_shape(trimmed) {
                return Err(IngestError::InvalidExtractionField {
                    field: key.to_string(),
                    reason: format!("{trimmed:?} is not a decimal string with two fraction digits"),
                });
            }
            Ok(Some(trimmed.to_string()))
        }
        Some(other) => Err(IngestError::InvalidExtractionField {
            field: key.to_string(),
            reason: format!("expected a decimal string, got {}", type_name(other)),
        }),
    }
}

fn is_amount_shape(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    let Some((whole, frac)) = s.split_once('.') else {
        return false;
    };
    !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.len() == 2
        && frac.bytes().all(|b| b.is_ascii_digit())
}

fn currency(fields: &Map<String, Value>) -> Result<Option<String>, IngestError> {
    let Some(raw) = optional_str(fields, "currency")? else {
        return Ok(None);
    };
    if raw.len() != 3 || !raw.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(IngestError::InvalidExtractionField {
            field: "currency".into(),
            reason: format!("{raw:?} is not a three-letter currency code"),
        });
    }
    Ok(Some(raw.to_ascii_uppercase()))
}

fn sha256(fields: &Map<String, Value>) -> Result<Option<String>, IngestError> {
    let Some(raw) = optional_str(fields, "sha256")? else {
        return Ok(None);
    };
    if raw.len() != 64 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(IngestError::InvalidExtractionField {
            field: "sha256".into(),
            reason: "expected 64 hex characters".into(),
        });
    }
    Ok(Some(raw.to_ascii_lowercase()))
}

/// Keywords arrive either as a list of strings or as a single delimited
/// string. Entries are trimmed, deduplicated, and kept in first-seen order.
fn keywords(fields: &Map<String, Value>) -> Result<Vec<String>, IngestError> {
    let raw: Vec<String> = match fields.get("keywords") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(s)) => s
            .split([',', ';', '\n'])
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => out.push(s.clone()),
                    other => {
                        return Err(IngestError::InvalidExtractionField {
                            field: "keywords".into(),
                            reason: format!(
                                "list entries must be strings, got {}",
                                type_name(other)
                            ),
                        })
                    }
                }
            }
            out
        }
        Some(other) => {
            return Err(IngestError::InvalidExtractionField {
                field: "keywords".into(),
                reason: format!("expected a list or string, got {}", type_name(other)),
            })
        }
    };

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for keyword in raw {
        let trimmed = keyword.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_ascii_lowercase()) {
            out.push(trimmed.to_string());
        }
    }
    Ok(out)
}

fn typed_list<T: serde::de::DeserializeOwned>(
    fields: &Map<String, Value>,
    key: &str,
) -> Result<Vec<T>, IngestError> {
    match fields.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value @ Value::Array(_)) => serde_json::from_value(value.clone()).map_err(|err| {
            IngestError::InvalidExtractionField {
                field: key.to_string(),
                reason: err.to_string(),
            }
        }),
        Some(other) => Err(IngestError::InvalidExtractionField {
            field: key.to_string(),
            reason: format!("expected a list, got {}", type_name(other)),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
