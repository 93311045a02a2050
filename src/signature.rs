//! Message authentication for inbound webhook deliveries.
//!
//! Two schemes are accepted:
//!
//! - **Canonical**: `X-Signature` carries hex HMAC-SHA256 over
//!   `"{timestamp}." + raw_body` keyed with the tenant secret.
//! - **Legacy**: `X-Secret-Header` carries the pre-shared tenant secret
//!   verbatim. Accepted only when no signature is present, the event id
//!   arrived in a header, and the config still allows the scheme.
//!
//! Both comparisons are constant-time. Verification is a pure check; it never
//! mutates state.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::types::WebhookDelivery;

type HmacSha256 = Hmac<Sha256>;

/// Per-tenant webhook credentials.
#[derive(Debug, Clone)]
pub struct TenantSecret {
    pub secret: String,
    pub enabled: bool,
}

/// Lookup seam for tenant credentials, so the pipeline never owns a tenant
/// table of its own.
pub trait TenantDirectory: Send + Sync {
    fn webhook_secret(&self, company_id: i64) -> Option<TenantSecret>;
}

/// Compute the canonical hex signature for a body. Shared by the verifier and
/// by tests that forge valid deliveries.
pub fn sign(secret: &str, timestamp: i64, raw_body: &[u8]) -> String {
    hex::encode(sign_bytes(secret, timestamp, raw_body))
}

fn sign_bytes(secret: &str, timestamp: i64, raw_body: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(raw_body);
    mac.finalize().into_bytes().to_vec()
}

/// Verify a delivery against the tenant secret.
///
/// `now` is injected so drift handling is testable without clock games.
pub fn verify(
    delivery: &WebhookDelivery<'_>,
    secret: &str,
    now: i64,
    config: &IngestConfig,
) -> Result<(), IngestError> {
    let timestamp = parse_timestamp(delivery.timestamp)?;

    let drift = (now - timestamp).abs();
    if drift > config.timestamp_drift_secs {
        return Err(IngestError::StaleRequest(format!(
            "timestamp skew of {drift}s exceeds the {}s window",
            config.timestamp_drift_secs
        )));
    }

    match delivery.signature.map(str::trim).filter(|s| !s.is_empty()) {
        Some(signature) => verify_hmac(signature, secret, timestamp, delivery.raw_body),
        None => verify_legacy(delivery, secret, config),
    }
}

fn parse_timestamp(header: Option<&str>) -> Result<i64, IngestError> {
    header
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| IngestError::AuthenticationFailed("missing timestamp header".into()))?
        .parse::<i64>()
        .map_err(|_| IngestError::AuthenticationFailed("invalid timestamp header".into()))
}

fn verify_hmac(
    signature: &str,
    secret: &str,
    timestamp: i64,
    raw_body: &[u8],
) -> Result<(), IngestError> {
    let provided = hex::decode(signature)
        .map_err(|_| IngestError::AuthenticationFailed("signature is not valid hex".into()))?;
    let expected = sign_bytes(secret, timestamp, raw_body);

    // Length leaks nothing useful; content comparison must be constant-time.
    if provided.len() != expected.len()
        || provided.ct_eq(&expected).unwrap_u8() != 1
    {
        return Err(IngestError::AuthenticationFailed(
            "signature mismatch".into(),
        ));
    }
    Ok(())
}

fn verify_legacy(
    delivery: &WebhookDelivery<'_>,
    secret: &str,
    config: &IngestConfig,
) -> Result<(), IngestError> {
    if !config.allow_legacy_secret {
        return Err(IngestError::AuthenticationFailed(
            "legacy secret scheme is disabled".into(),
        ));
    }
    let provided = delivery
        .shared_secret
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            IngestError::AuthenticationFailed("missing signature and shared secret".into())
        })?;
    // The legacy scheme has no body binding, so at minimum the event id must
    // arrive in a header rather than the (unauthenticated) body.
    if delivery.event_id.map(str::trim).filter(|id| !id.is_empty()).is_none() {
        return Err(IngestError::AuthenticationFailed(
            "legacy scheme requires the event id header".into(),
        ));
    }
    let provided = provided.as_bytes();
    let expected = secret.as_bytes();
    if provided.len() != expected.len() || provided.ct_eq(expected).unwrap_u8() != 1 {
        return Err(IngestError::AuthenticationFailed(
            "shared secret mismatch".into(),
        ));
    }
    Ok(())
}
