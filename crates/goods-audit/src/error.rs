//! # Audit Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Audit Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Message bus   │  │   Analytical store      │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Config         │  │  Connection     │  │  Sink                   │ │
//! │  │                 │  │  Publish        │  │                         │ │
//! │  │                 │  │  Subscribe      │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Serialization covers both directions of the JSON payload.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these reach an HTTP client: the producer side is logged and
//! swallowed by the service, the consumer side is logged by the batcher.

use thiserror::Error;

/// Result type alias for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

#[derive(Debug, Error)]
pub enum AuditError {
    /// Invalid DSN, subject or batching parameters.
    #[error("Invalid audit configuration: {0}")]
    Config(String),

    /// Could not reach the message bus.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The bus refused or dropped a publish.
    #[error("Publish failed: {0}")]
    Publish(String),

    /// Subscribing to the audit subject failed.
    #[error("Subscribe failed: {0}")]
    Subscribe(String),

    /// JSON encoding or decoding of an event failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The analytical store rejected a batch or its schema.
    #[error("Sink write failed: {0}")]
    Sink(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        AuditError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for AuditError {
    fn from(err: url::ParseError) -> Self {
        AuditError::Config(err.to_string())
    }
}

impl From<clickhouse::error::Error> for AuditError {
    fn from(err: clickhouse::error::Error) -> Self {
        AuditError::Sink(err.to_string())
    }
}

impl From<async_nats::ConnectError> for AuditError {
    fn from(err: async_nats::ConnectError) -> Self {
        AuditError::Connection(err.to_string())
    }
}

impl From<async_nats::PublishError> for AuditError {
    fn from(err: async_nats::PublishError) -> Self {
        AuditError::Publish(err.to_string())
    }
}

impl From<async_nats::SubscribeError> for AuditError {
    fn from(err: async_nats::SubscribeError) -> Self {
        AuditError::Subscribe(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_error_converts() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        let audit: AuditError = err.into();
        assert!(matches!(audit, AuditError::Serialization(_)));
    }

    #[test]
    fn test_url_error_is_config() {
        let err = url::Url::parse("::").unwrap_err();
        assert!(matches!(AuditError::from(err), AuditError::Config(_)));
    }
}
