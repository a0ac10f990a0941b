//! # goods-core: Domain Model of the Goods Catalog
//!
//! This crate holds everything about goods that can be decided without
//! touching a database, cache or message bus.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Goods Catalog Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  goods-api (axum + JWT)                         │   │
//! │  │   /good/create  /good/get  /good/update  /goods/list  ...       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  GoodsService (orchestrator)                    │   │
//! │  │      validate ──► store ──► cache invalidate ──► audit          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ goods-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ priority  │  │  context  │  │ validation│  │   │
//! │  │   │   Good    │  │   moves   │  │  cancel + │  │   rules   │  │   │
//! │  │   │ AuditEvent│  │  ±1 shift │  │  deadline │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │         NO DATABASE • NO NETWORK • NO CACHE                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          goods-db (Postgres)     goods-audit (NATS, ClickHouse) │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Good, AuditEvent, request/response shapes
//! - [`priority`] - Planning of reprioritization moves
//! - [`context`] - Cancellation and deadline carried by every I/O call
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use goods_core::priority::PriorityMove;
//!
//! // Moving the good at priority 3 up to priority 1 pushes 1 and 2 down.
//! let plan = PriorityMove::plan(3, 1);
//! assert_eq!(plan.shift_range(), Some((1, 2)));
//! assert_eq!(plan.delta(), 1);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod context;
pub mod error;
pub mod priority;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use context::Context;
pub use error::{ContextError, CoreError, CoreResult, ValidationError};
pub use priority::PriorityMove;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Page size used when a list request carries no usable limit.
pub const DEFAULT_LIST_LIMIT: i64 = 10;

/// Offset used when a list request carries no usable offset.
pub const DEFAULT_LIST_OFFSET: i64 = 0;

/// Subject the audit pipeline publishes to and consumes from.
pub const AUDIT_SUBJECT: &str = "goods.logs";
