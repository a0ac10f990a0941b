//! # Database Error Types
//!
//! Error types for store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  Postgres Error (sqlx::Error)        ContextError (cancel/deadline)    │
//! │       │                                   │                             │
//! │       └──────────────┬────────────────────┘                             │
//! │                      ▼                                                  │
//! │  DbError (this module) ← Adds categorization                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CoreError (GoodsService)                                              │
//! │       ├── NotFound       → GoodNotFound (404)                          │
//! │       ├── SamePriority   → SamePriority (400)                          │
//! │       └── everything else → Internal (500)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use goods_core::ContextError;
use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - No row for `(id, project_id)`
    /// - Row exists but is soft-deleted and the operation locks live rows only
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Reprioritize requested the priority the good already holds.
    #[error("good already has priority {priority}")]
    SamePriority { priority: i32 },

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Postgres unreachable or refusing the credentials
    /// - Malformed DSN
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    ///
    /// ## When This Occurs
    /// - Invalid SQL in migration
    /// - Checksum mismatch on an already applied migration
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed on the server.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Begin or commit failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The caller's context was cancelled mid-operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline passed mid-operation.
    #[error("operation timed out")]
    Timeout,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// NotFound for the good addressed by `(id, project_id)`.
    pub fn good_not_found(id: i32, project_id: i32) -> Self {
        Self::not_found("good", format!("{id} (project {project_id})"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → DbError::QueryFailed (with SQLSTATE)
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("record", "unknown"),

            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
                DbError::QueryFailed(format!("[{code}] {}", db_err.message()))
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<ContextError> for DbError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => DbError::Cancelled,
            ContextError::DeadlineExceeded => DbError::Timeout,
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
