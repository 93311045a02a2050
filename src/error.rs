//! Error types produced by the ingestion pipeline.
//!
//! Every stage of the pipeline fails closed: any ambiguity in a delivery is a
//! rejection with exactly one of these variants. Errors are typed, cloneable,
//! and comparable so callers can branch on specific cases and tests can assert
//! on them precisely.
//!
//! Each variant carries a stable wire code (see [`IngestError::code`]) and a
//! suggested HTTP status ([`IngestError::http_status_code`]); the server crate
//! maps both into its response envelope. Display strings are safe to return to
//! callers; none of them echo raw file bytes.

use thiserror::Error;

/// Rejection reasons for one webhook delivery.
///
/// The enum is `#[non_exhaustive]`: callers should always keep a catch-all arm
/// so future validation stages can add variants without breaking them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// Signature mismatch, missing/invalid timestamp header, disabled tenant,
    /// or a malformed legacy credential.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The timestamp header parsed but falls outside the configured drift
    /// window, so the delivery is treated as a replay.
    #[error("request timestamp is outside the accepted drift window: {0}")]
    StaleRequest(String),

    /// Neither the event id header nor the body `event_id` field is present.
    #[error("missing event id in header and body")]
    MissingEventId,

    /// No tenant is registered for the `company_id` in the payload.
    #[error("unknown company {0}")]
    UnknownCompany(i64),

    /// A reservation for this `(company_id, event_id)` is still in flight.
    /// The caller should retry after the first delivery settles.
    #[error("event {event_id} for company {company_id} is already being processed")]
    AlreadyReserved { company_id: i64, event_id: String },

    /// The file payload is not a well-formed data URI or bare base64 string.
    #[error("invalid file encoding: {0}")]
    InvalidEncoding(String),

    /// Decoded file is below the minimum byte floor.
    #[error("decoded file is {actual} bytes, below the {min} byte minimum")]
    FileTooSmall { actual: usize, min: usize },

    /// Decoded file exceeds the configured size cap.
    #[error("decoded file is {actual} bytes, above the {max} byte limit")]
    FileTooLarge { actual: usize, max: usize },

    /// The leading bytes do not match the magic signature the declared MIME
    /// type requires. The detected bytes are logged server-side only.
    #[error("file content does not match declared type {expected}")]
    SignatureMismatch { expected: String },

    /// A metadata field violated its format rule.
    #[error("invalid extraction field {field}: {reason}")]
    InvalidExtractionField { field: String, reason: String },

    /// The request body is not a JSON object or lacks a required field.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The storage collaborator rejected the write; the event reservation has
    /// been released so the caller can retry the same event id.
    #[error("storage write failed: {0}")]
    StorageWriteFailed(String),
}

impl IngestError {
    /// Stable machine-readable code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::AuthenticationFailed(_) => "AuthenticationFailed",
            IngestError::StaleRequest(_) => "StaleRequest",
            IngestError::MissingEventId => "MissingEventId",
            IngestError::UnknownCompany(_) => "UnknownCompany",
            IngestError::AlreadyReserved { .. } => "AlreadyReserved",
            IngestError::InvalidEncoding(_) => "InvalidEncoding",
            IngestError::FileTooSmall { .. } => "FileTooSmall",
            IngestError::FileTooLarge { .. } => "FileTooLarge",
            IngestError::SignatureMismatch { .. } => "SignatureMismatch",
            IngestError::InvalidExtractionField { .. } => "InvalidExtractionField",
            IngestError::MalformedPayload(_) => "MalformedPayload",
            IngestError::StorageWriteFailed(_) => "StorageWriteFailed",
        }
    }

    /// Suggested HTTP status code for this rejection.
    pub fn http_status_code(&self) -> u16 {
        match self {
            IngestError::AuthenticationFailed(_) | IngestError::StaleRequest(_) => 401,
            IngestError::UnknownCompany(_) => 404,
            IngestError::AlreadyReserved { .. } => 409,
            IngestError::StorageWriteFailed(_) => 500,
            _ => 400,
        }
    }

    /// True when the rejection was caused by the caller's input rather than a
    /// backend failure.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, IngestError::StorageWriteFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(IngestError::MissingEventId.code(), "MissingEventId");
        assert_eq!(
            IngestError::InvalidEncoding("bad".into()).code(),
            "InvalidEncoding"
        );
        assert_eq!(
            IngestError::FileTooSmall { actual: 31, min: 32 }.code(),
            "FileTooSmall"
        );
    }

    #[test]
    fn status_codes_follow_contract() {
        assert_eq!(
            IngestError::AuthenticationFailed("nope".into()).http_status_code(),
            401
        );
        assert_eq!(IngestError::StaleRequest("old".into()).http_status_code(), 401);
        assert_eq!(IngestError::MissingEventId.http_status_code(), 400);
        assert_eq!(
            IngestError::AlreadyReserved {
                company_id: 1,
                event_id: "evt".into()
            }
            .http_status_code(),
            409
        );
        assert_eq!(
            IngestError::StorageWriteFailed("disk".into()).http_status_code(),
            500
        );
    }

    #[test]
    fn display_never_leaks_bytes() {
        let err = IngestError::SignatureMismatch {
            expected: "application/pdf".into(),
        };
        assert_eq!(
            err.to_string(),
            "file content does not match declared type application/pdf"
        );
    }

    #[test]
    fn storage_failures_are_not_client_errors() {
        assert!(!IngestError::StorageWriteFailed("io".into()).is_client_error());
        assert!(IngestError::MissingEventId.is_client_error());
    }
}
