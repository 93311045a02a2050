use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::storage::LocalDocumentStore;
use dashmap::DashMap;
use docgate::{IngestPipeline, MemoryEventLedger};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: company id -> (count, window_start)
    pub rate_limiter: Arc<DashMap<i64, (u32, std::time::Instant)>>,

    /// Webhook processing pipeline (shared across requests)
    pub pipeline: IngestPipeline,

    /// Prometheus recorder handle when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create new server state
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let metrics = if config.metrics_enabled {
            // The recorder is global; a second state (tests) reuses nothing
            // and simply serves no metrics.
            PrometheusBuilder::new().install_recorder().ok()
        } else {
            None
        };

        let ledger = Arc::new(MemoryEventLedger::new());
        let store = Arc::new(LocalDocumentStore::new(config.storage_root.clone()));
        let pipeline = IngestPipeline::new(config.ingest_config(), ledger, store);

        Ok(Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            pipeline,
            metrics,
        })
    }

    /// Check rate limit for a company (fixed one-minute window)
    pub fn check_rate_limit(&self, company_id: i64) -> bool {
        let now = std::time::Instant::now();
        let window = std::time::Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(company_id).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        // Reset if window has passed
        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        // Check limit
        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}
