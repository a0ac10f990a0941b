//! # Goods API
//!
//! HTTP server for the goods catalog.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Goods API Layers                                │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  routes   /api/v1/...  (require_auth: RS256 bearer token)        │  │
//! │  │  • POST   /good/create        • GET    /goods/list               │  │
//! │  │  • GET    /good/get           • PATCH  /good/reprioritize        │  │
//! │  │  • PATCH  /good/update        • DELETE /good/remove              │  │
//! │  └───────────────────────────────┬──────────────────────────────────┘  │
//! │                                  ▼                                      │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  GoodsService                                                     │  │
//! │  │  GoodsStore (Postgres) · Cache (Redis | Null) · AuditPublisher   │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables, see [`config::ApiConfig`]:
//! - `BIND_ADDRESS` - listen address (default: 0.0.0.0:8081)
//! - `POSTGRES_DSN`, `CLICKHOUSE_DSN`, `NATS_URL`, `REDIS_ADDR`
//! - `CACHE_TTL_SECS` - cache entry lifetime (default: 60)
//! - `REQUEST_TIMEOUT_SECS`, `SHUTDOWN_TIMEOUT_SECS` (default: 10 each)

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod routes;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use goods_core::Context;
use goods_db::Database;

// Re-exports
pub use auth::JwtVerifier;
pub use config::ApiConfig;
pub use error::ApiError;
pub use services::GoodsService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: GoodsService,
    pub verifier: Arc<JwtVerifier>,

    /// Pinged by `/health`; absent when the store is not Postgres.
    pub db: Option<Database>,

    /// Parent of every request context. Cancelling it aborts in-flight work.
    pub root: Context,

    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: GoodsService, verifier: JwtVerifier, request_timeout: Duration) -> Self {
        AppState {
            service,
            verifier: Arc::new(verifier),
            db: None,
            root: Context::background(),
            request_timeout,
        }
    }

    pub fn with_database(mut self, db: Database) -> Self {
        self.db = Some(db);
        self
    }

    pub fn with_root(mut self, root: Context) -> Self {
        self.root = root;
        self
    }

    /// Context for one request: child of `root`, bounded by the request timeout.
    pub fn request_context(&self) -> Context {
        self.root.child(Some(self.request_timeout))
    }
}
