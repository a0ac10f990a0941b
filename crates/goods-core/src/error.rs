//! # Error Types
//!
//! Domain-specific error types for goods-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  goods-core errors (this file)                                         │
//! │  ├── CoreError        - What the service returns                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ContextError     - Cancellation / deadline                        │
//! │                                                                         │
//! │  goods-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  goods-api errors (in app)                                             │
//! │  └── ApiError         - What HTTP clients see                          │
//! │                                                                         │
//! │  Flow: ValidationError / DbError → CoreError → ApiError → client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Client-visible mapping
//! | CoreError       | HTTP |
//! |-----------------|------|
//! | `Validation`    | 400  |
//! | `SamePriority`  | 400  |
//! | `GoodNotFound`  | 404  |
//! | `Unauthorized`  | 401  |
//! | `Internal`      | 500  |

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors surfaced by the goods service.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed validation before any dependency was touched.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The good does not exist in the given project.
    ///
    /// ## When This Occurs
    /// - No row with `(id, project_id)`
    /// - The row is soft-deleted and the operation needs a live good
    ///   (update, remove, reprioritize)
    #[error("good {id} not found in project {project_id}")]
    GoodNotFound { id: i32, project_id: i32 },

    /// Reprioritize asked for the priority the good already has.
    ///
    /// ## When This Occurs
    /// ```text
    /// good 7 @ priority 4
    ///      │
    ///      ▼
    /// PATCH /good/reprioritize {"newPriority": 4}
    ///      │
    ///      ▼
    /// SamePriority → 400
    /// ```
    #[error("good already has priority {priority}")]
    SamePriority { priority: i32 },

    /// Missing, malformed, expired or wrongly signed bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Anything the client cannot fix: store, encoding, timeouts.
    ///
    /// The message is for logs only and is never rendered to clients.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ContextError> for CoreError {
    fn from(err: ContextError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g. non-numeric query parameter).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Context Error
// =============================================================================

/// Why a context-bound operation stopped early.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The owning request or task was cancelled.
    #[error("context cancelled")]
    Cancelled,

    /// The deadline passed before the operation finished.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
