use docgate::{IngestConfig, TenantDirectory, TenantSecret};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Rate limit: deliveries per minute per company
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    /// Webhook tenants keyed by company id (in production, use a database)
    #[serde(default)]
    pub tenants: HashMap<String, TenantConfig>,

    /// Root directory for stored documents
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,

    /// Accepted signing-timestamp skew in seconds
    #[serde(default = "default_timestamp_drift_secs")]
    pub timestamp_drift_secs: i64,

    /// Minimum decoded file size in bytes
    #[serde(default = "default_min_file_bytes")]
    pub min_file_bytes: usize,

    /// Maximum decoded file size in bytes
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,

    /// Accept the legacy pre-shared-secret header scheme
    #[serde(default = "default_true")]
    pub allow_legacy_secret: bool,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

/// Per-tenant webhook credentials
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TenantConfig {
    pub secret: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            tenants: HashMap::new(),
            storage_root: default_storage_root(),
            timestamp_drift_secs: default_timestamp_drift_secs(),
            min_file_bytes: default_min_file_bytes(),
            max_file_bytes: default_max_file_bytes(),
            allow_legacy_secret: default_true(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and config files
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("DOCGATE_SERVER").separator("__"));

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;

        // Add a demo tenant if none configured (for development)
        if config.tenants.is_empty() {
            tracing::warn!("No tenants configured, using demo company 1 with secret 'demo-secret'");
            config.tenants.insert(
                "1".to_string(),
                TenantConfig {
                    secret: "demo-secret".to_string(),
                    enabled: true,
                },
            );
        }

        Ok(config)
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    /// Pipeline configuration derived from the server settings
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig::default()
            .with_timestamp_drift_secs(self.timestamp_drift_secs)
            .with_min_file_bytes(self.min_file_bytes)
            .with_max_file_bytes(self.max_file_bytes)
            .with_legacy_secret(self.allow_legacy_secret)
    }
}

impl TenantDirectory for ServerConfig {
    fn webhook_secret(&self, company_id: i64) -> Option<TenantSecret> {
        self.tenants
            .get(&company_id.to_string())
            .map(|tenant| TenantSecret {
                secret: tenant.secret.clone(),
                enabled: tenant.enabled,
            })
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    30
}

fn default_rate_limit_per_minute() -> u32 {
    120
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("data/documents")
}

fn default_timestamp_drift_secs() -> i64 {
    IngestConfig::default().timestamp_drift_secs
}

fn default_min_file_bytes() -> usize {
    IngestConfig::default().min_file_bytes
}

fn default_max_file_bytes() -> usize {
    IngestConfig::default().max_file_bytes
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
