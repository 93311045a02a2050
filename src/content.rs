//! File content validation: decoding, size floor, magic-byte sniffing.
//!
//! The payload's `file_base64` field is either a data URI of the exact shape
//! `data:<mime>;base64,<payload>` or a bare base64 string. Decoding is strict;
//! anything that is not canonical base64 rejects the event. When the declared
//! type (data-URI mime or filename extension) implies PDF, PNG, or JPEG, the
//! decoded bytes must open with that format's magic signature.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::types::StoredFile;

pub const PDF_MAGIC: &[u8] = b"%PDF";
pub const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
pub const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8];

/// Decode and validate a file payload.
///
/// `event_id` is only used for diagnostic logging; rejections sent to the
/// caller never include file bytes.
pub fn validate_content(
    file_base64: &str,
    file_name: Option<&str>,
    event_id: &str,
    config: &IngestConfig,
) -> Result<StoredFile, IngestError> {
    let (payload, declared_mime) = split_data_uri(file_base64)?;

    let bytes = BASE64
        .decode(payload)
        .map_err(|err| IngestError::InvalidEncoding(format!("base64 decode failed: {err}")))?;

    if bytes.len() < config.min_file_bytes {
        return Err(IngestError::FileTooSmall {
            actual: bytes.len(),
            min: config.min_file_bytes,
        });
    }
    if bytes.len() > config.max_file_bytes {
        return Err(IngestError::FileTooLarge {
            actual: bytes.len(),
            max: config.max_file_bytes,
        });
    }

    let mime = resolve_mime(declared_mime.as_deref(), file_name);
    check_magic_signature(&bytes, &mime, event_id)?;

    Ok(StoredFile { bytes, mime })
}

/// Split a data URI into its base64 payload and declared MIME type, or pass a
/// bare payload through. Prefix shapes that look like a data URI but are not
/// the exact `data:<mime>;base64,` form are rejected.
fn split_data_uri(raw: &str) -> Result<(&str, Option<String>), IngestError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(IngestError::InvalidEncoding("empty file payload".into()));
    }

    if let Some(rest) = raw.strip_prefix("data:") {
        let Some((header, payload)) = rest.split_once(',') else {
            return Err(IngestError::InvalidEncoding(
                "data URI without payload separator".into(),
            ));
        };
        let Some(mime) = header.strip_suffix(";base64") else {
            return Err(IngestError::InvalidEncoding(
                "data URI is not base64-encoded".into(),
            ));
        };
        let mime = mime.trim();
        let declared = if mime.is_empty() {
            None
        } else {
            Some(mime.to_ascii_lowercase())
        };
        return Ok((payload, declared));
    }

    // A comma-bearing prefix that mentions base64 but lacks the data: scheme
    // is a mangled URI, not payload data.
    if let Some((prefix, _)) = raw.split_once(',') {
        if prefix.contains("base64") {
            return Err(IngestError::InvalidEncoding(
                "malformed data URI prefix".into(),
            ));
        }
    }

    Ok((raw, None))
}

/// Infer the MIME type: the data-URI declaration wins, then the filename
/// extension, then `application/octet-stream`.
pub fn resolve_mime(declared: Option<&str>, file_name: Option<&str>) -> String {
    if let Some(mime) = declared.map(str::trim).filter(|m| !m.is_empty()) {
        return mime.to_ascii_lowercase();
    }
    match file_name.and_then(extension) {
        Some(ext) => match ext.as_str() {
            "pdf" => "application/pdf".into(),
            "png" => "image/png".into(),
            "jpg" | "jpeg" => "image/jpeg".into(),
            _ => "application/octet-stream".into(),
        },
        None => "application/octet-stream".into(),
    }
}

fn extension(file_name: &str) -> Option<String> {
    let name = file_name.trim();
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

fn check_magic_signature(
    bytes: &[u8],
    mime: &str,
    event_id: &str,
) -> Result<(), IngestError> {
    let expected: &[u8] = match mime {
        "application/pdf" => PDF_MAGIC,
        "image/png" => PNG_MAGIC,
        "image/jpeg" => JPEG_MAGIC,
        _ => return Ok(()),
    };

    if !bytes.starts_with(expected) {
        let detected_len = bytes.len().min(expected.len());
        tracing::warn!(
            event_id = %event_id,
            declared_mime = %mime,
            expected_signature = %hex::encode(expected),
            detected_signature = %hex::encode(&bytes[..detected_len]),
            "file signature mismatch"
        );
        return Err(IngestError::SignatureMismatch {
            expected: mime.to_string(),
        });
    }
    Ok(())
}

/// Strip any path components and unsafe characters from a caller-supplied
/// file name. Falls back to `document` when nothing usable remains.
pub fn safe_filename(value: &str) -> String {
    let base = value
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let mut out = String::with_capacity(base.len());
    let mut last_was_space = false;
    for ch in base.chars() {
        if ch.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
            }
            last_was_space = true;
            continue;
        }
        last_was_space = false;
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch);
        } else {
            out.push('_');
        }
    }

    let trimmed = out.trim_matches(['.', '_', '-', ' ']).to_string();
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed
    }
}

/// Default file name for deliveries that do not supply one.
pub fn default_file_name(event_id: &str, mime: &str) -> String {
    let ext = match mime {
        "application/pdf" => "pdf",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        _ => "bin",
    };
    format!("document_{}.{}", safe_filename(event_id), ext)
}
