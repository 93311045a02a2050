//! Webhook ingestion endpoint.
//!
//! Raw body bytes are handed to the pipeline untouched so signature
//! verification covers exactly what the sender signed. The handler's own job
//! is transport concerns: body size, per-company rate limiting, header
//! extraction, and shaping the response.

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use docgate::{IngestOutcome, WebhookDelivery};
use serde_json::json;
use std::sync::Arc;

/// POST /api/webhooks/ingest
pub async fn ingest_webhook(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<impl IntoResponse> {
    if body.len() > state.config.max_body_size() {
        return Err(ServerError::PayloadTooLarge(state.config.max_body_size_mb));
    }

    // Rate limiting keys off the claimed company id; the pipeline verifies
    // the claim cryptographically right after.
    let parsed = docgate::types::parse_body(&body)?;
    let company_id = docgate::types::company_id_of(&parsed)?;
    if !state.check_rate_limit(company_id) {
        metrics::counter!("docgate_rate_limited_total").increment(1);
        return Err(ServerError::RateLimitExceeded);
    }

    let delivery = WebhookDelivery {
        raw_body: &body,
        timestamp: header_str(&headers, "x-timestamp"),
        signature: header_str(&headers, "x-signature"),
        shared_secret: header_str(&headers, "x-secret-header"),
        event_id: header_str(&headers, "x-event-id"),
    };

    let outcome = state
        .pipeline
        .process(delivery, state.config.as_ref())
        .await;

    match outcome {
        Ok(IngestOutcome::Stored(record)) => {
            metrics::counter!("docgate_webhook_deliveries_total", "outcome" => "stored")
                .increment(1);
            metrics::histogram!("docgate_document_bytes").record(record.size as f64);
            Ok(Json(json!({
                "status": "ok",
                "document_id": record.document_id,
            })))
        }
        Ok(IngestOutcome::Duplicate { document_id }) => {
            metrics::counter!("docgate_webhook_deliveries_total", "outcome" => "duplicate")
                .increment(1);
            Ok(Json(json!({
                "status": "duplicate",
                "document_id": document_id,
            })))
        }
        Err(err) => {
            metrics::counter!("docgate_webhook_deliveries_total", "outcome" => "rejected")
                .increment(1);
            Err(ServerError::Ingest(err))
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
