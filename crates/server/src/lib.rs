//! docgate server - HTTP webhook intake for document ingestion
//!
//! This crate exposes the docgate pipeline over HTTP. An automation engine
//! posts HMAC-signed JSON deliveries carrying a base64 file plus optional
//! extracted metadata; the server authenticates, deduplicates, validates, and
//! stores each document exactly once per logical event.
//!
//! # Endpoints
//!
//! - `POST /api/webhooks/ingest` - signed webhook delivery
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod storage;

pub use config::{ServerConfig, TenantConfig};
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
pub use storage::LocalDocumentStore;
