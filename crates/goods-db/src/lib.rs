//! # goods-db: Authoritative Store for the Goods Catalog
//!
//! Postgres access for goods: pool, transactions, migrations and the
//! [`GoodsStore`] implementation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Goods Write Path                                 │
//! │                                                                         │
//! │  GoodsService::reprioritize                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     goods-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repository   │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (goods.rs)   │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ PgPool        │◄───│ GoodsRepo     │    │ 0001_init    │  │   │
//! │  │   │ within_tx     │    │ impl          │    │              │  │   │
//! │  │   │ tx_from       │    │  GoodsStore   │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Postgres: goods, projects                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Pool configuration, `within_transaction`, `tx_from`
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`store`] - The `GoodsStore` capability trait
//! - [`repository`] - Postgres implementation of the store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use goods_core::{Context, GoodInput};
//! use goods_db::{Database, DbConfig, GoodsStore};
//!
//! let db = Database::new(DbConfig::new(dsn)).await?;
//! let ctx = Context::with_timeout(Duration::from_secs(5));
//! let good = db.goods().create(&ctx, 1, &GoodInput::new("one")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Conn, Database, DbConfig};
pub use repository::goods::GoodsRepository;
pub use store::GoodsStore;
