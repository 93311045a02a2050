//! Pipeline configuration.

use serde::{Deserialize, Serialize};

/// Tunables for one ingestion pipeline instance.
///
/// Defaults mirror the production contract: a five minute timestamp drift
/// window, a 32 byte file floor, and the legacy shared-secret scheme enabled
/// until policy retires it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Maximum allowed `|now - X-Timestamp|` in seconds before a delivery is
    /// rejected as a replay.
    #[serde(default = "default_timestamp_drift_secs")]
    pub timestamp_drift_secs: i64,

    /// Minimum decoded file size in bytes. Anything smaller cannot be a real
    /// invoice or receipt scan.
    #[serde(default = "default_min_file_bytes")]
    pub min_file_bytes: usize,

    /// Maximum decoded file size in bytes.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,

    /// Whether the pre-shared-secret header is still accepted in place of an
    /// HMAC signature. Kept on for backward compatibility with older engine
    /// workflows.
    #[serde(default = "default_true")]
    pub allow_legacy_secret: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            timestamp_drift_secs: default_timestamp_drift_secs(),
            min_file_bytes: default_min_file_bytes(),
            max_file_bytes: default_max_file_bytes(),
            allow_legacy_secret: default_true(),
        }
    }
}

impl IngestConfig {
    pub fn with_timestamp_drift_secs(mut self, secs: i64) -> Self {
        self.timestamp_drift_secs = secs;
        self
    }

    pub fn with_min_file_bytes(mut self, bytes: usize) -> Self {
        self.min_file_bytes = bytes;
        self
    }

    pub fn with_max_file_bytes(mut self, bytes: usize) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    pub fn with_legacy_secret(mut self, allow: bool) -> Self {
        self.allow_legacy_secret = allow;
        self
    }
}

fn default_timestamp_drift_secs() -> i64 {
    300
}

fn default_min_file_bytes() -> usize {
    32
}

fn default_max_file_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_true() -> bool {
    true
}
