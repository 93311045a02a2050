//! Error taxonomy tests: every rejection carries a stable code and status.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use docgate::{
    signature, IngestConfig, IngestError, IngestPipeline, MemoryDocumentStore, MemoryEventLedger,
    TenantDirectory, TenantSecret, WebhookDelivery,
};
use serde_json::{json, Value};
use std::sync::Arc;

const COMPANY: i64 = 11;
const SECRET: &str = "error-secret";

struct OneTenant;

impl TenantDirectory for OneTenant {
    fn webhook_secret(&self, company_id: i64) -> Option<TenantSecret> {
        (company_id == COMPANY).then(|| TenantSecret {
            secret: SECRET.to_string(),
            enabled: true,
        })
    }
}

fn pipeline() -> IngestPipeline {
    IngestPipeline::new(
        IngestConfig::default(),
        Arc::new(MemoryEventLedger::new()),
        Arc::new(MemoryDocumentStore::new()),
    )
}

fn pdf_base64() -> String {
    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.resize(64, b'x');
    BASE64.encode(bytes)
}

async fn deliver_expect_err(body: &Value) -> IngestError {
    let raw = body.to_string();
    let now = chrono::Utc::now().timestamp();
    let timestamp = now.to_string();
    let sig = signature::sign(SECRET, now, raw.as_bytes());
    pipeline()
        .process(
            WebhookDelivery {
                raw_body: raw.as_bytes(),
                timestamp: Some(&timestamp),
                signature: Some(&sig),
                shared_secret: None,
                event_id: None,
            },
            &OneTenant,
        )
        .await
        .expect_err("delivery should be rejected")
}

#[tokio::test]
async fn missing_event_id_is_a_structured_rejection() {
    let err = deliver_expect_err(&json!({
        "company_id": COMPANY,
        "file_base64": pdf_base64(),
    }))
    .await;
    assert_eq!(err, IngestError::MissingEventId);
    assert_eq!(err.code(), "MissingEventId");
    assert_eq!(err.http_status_code(), 400);
}

#[tokio::test]
async fn unknown_company_maps_to_404() {
    let err = deliver_expect_err(&json!({
        "company_id": 999,
        "event_id": "evt-x",
        "file_base64": pdf_base64(),
    }))
    .await;
    assert_eq!(err, IngestError::UnknownCompany(999));
    assert_eq!(err.http_status_code(), 404);
}

#[tokio::test]
async fn non_object_extracted_is_invalid() {
    let err = deliver_expect_err(&json!({
        "company_id": COMPANY,
        "event_id": "evt-x",
        "file_base64": pdf_base64(),
        "extracted": "not an object",
    }))
    .await;
    assert!(
        matches!(err, IngestError::InvalidExtractionField { ref field, .. } if field == "extracted")
    );
    assert_eq!(err.code(), "InvalidExtractionField");
}

#[tokio::test]
async fn currency_length_is_enforced() {
    let err = deliver_expect_err(&json!({
        "company_id": COMPANY,
        "event_id": "evt-x",
        "file_base64": pdf_base64(),
        "extracted": { "currency": "EURO" },
    }))
    .await;
    assert!(
        matches!(err, IngestError::InvalidExtractionField { ref field, .. } if field == "currency")
    );
}

#[tokio::test]
async fn impossible_calendar_date_is_rejected() {
    let err = deliver_expect_err(&json!({
        "company_id": COMPANY,
        "event_id": "evt-x",
        "file_base64": pdf_base64(),
        "extracted": { "doc_date": "2023-02-29" },
    }))
    .await;
    assert!(
        matches!(err, IngestError::InvalidExtractionField { ref field, .. } if field == "doc_date")
    );
}

#[tokio::test]
async fn malformed_sha256_is_rejected() {
    let err = deliver_expect_err(&json!({
        "company_id": COMPANY,
        "event_id": "evt-x",
        "file_base64": pdf_base64(),
        "extracted": { "sha256": "deadbeef" },
    }))
    .await;
    assert!(
        matches!(err, IngestError::InvalidExtractionField { ref field, .. } if field == "sha256")
    );
}

#[tokio::test]
async fn non_json_body_is_malformed_payload() {
    let raw = "this is not json";
    let now = chrono::Utc::now().timestamp();
    let timestamp = now.to_string();
    let sig = signature::sign(SECRET, now, raw.as_bytes());
    let err = pipeline()
        .process(
            WebhookDelivery {
                raw_body: raw.as_bytes(),
                timestamp: Some(&timestamp),
                signature: Some(&sig),
                shared_secret: None,
                event_id: Some("evt-x"),
            },
            &OneTenant,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::MalformedPayload(_)));
    assert_eq!(err.http_status_code(), 400);
}

#[tokio::test]
async fn missing_file_payload_is_malformed() {
    let err = deliver_expect_err(&json!({
        "company_id": COMPANY,
        "event_id": "evt-x",
    }))
    .await;
    assert!(matches!(err, IngestError::MalformedPayload(_)));
}

#[tokio::test]
async fn string_company_ids_are_accepted_but_garbage_is_not() {
    let raw = json!({
        "company_id": "11",
        "event_id": "evt-string-company",
        "file_base64": pdf_base64(),
    })
    .to_string();
    let now = chrono::Utc::now().timestamp();
    let timestamp = now.to_string();
    let sig = signature::sign(SECRET, now, raw.as_bytes());
    let outcome = pipeline()
        .process(
            WebhookDelivery {
                raw_body: raw.as_bytes(),
                timestamp: Some(&timestamp),
                signature: Some(&sig),
                shared_secret: None,
                event_id: None,
            },
            &OneTenant,
        )
        .await;
    assert!(outcome.is_ok());

    let err = deliver_expect_err(&json!({
        "company_id": "acme",
        "event_id": "evt-x",
        "file_base64": pdf_base64(),
    }))
    .await;
    assert!(matches!(err, IngestError::MalformedPayload(_)));
}
