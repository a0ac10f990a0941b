//! # Audit Pipeline Configuration

use std::time::Duration;

use goods_core::AUDIT_SUBJECT;

use crate::error::{AuditError, AuditResult};

/// Size trigger used when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 30;

/// Time trigger used when none is configured.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Hard cap on events held in memory while the sink is failing.
pub const DEFAULT_MAX_BUFFERED: usize = 10_000;

/// Batching and routing settings shared by producer and consumer.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use goods_audit::AuditConfig;
///
/// let config = AuditConfig::default()
///     .batch_size(100)
///     .flush_interval(Duration::from_secs(2));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Bus subject. Default: `goods.logs`
    pub subject: String,

    /// Flush as soon as this many events are buffered. Default: 30
    pub batch_size: usize,

    /// Flush whatever is buffered this often. Default: 5 seconds
    pub flush_interval: Duration,

    /// Oldest events beyond this are dropped. Default: 10 000
    pub max_buffered: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            subject: AUDIT_SUBJECT.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_buffered: DEFAULT_MAX_BUFFERED,
        }
    }
}

impl AuditConfig {
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn max_buffered(mut self, max: usize) -> Self {
        self.max_buffered = max;
        self
    }

    /// Rejects settings the batcher cannot work with.
    pub fn validate(&self) -> AuditResult<()> {
        if self.subject.trim().is_empty() {
            return Err(AuditError::Config("subject must not be empty".into()));
        }
        if self.batch_size == 0 {
            return Err(AuditError::Config("batch size must be positive".into()));
        }
        if self.flush_interval.is_zero() {
            return Err(AuditError::Config("flush interval must be positive".into()));
        }
        if self.max_buffered < self.batch_size {
            return Err(AuditError::Config(format!(
                "max buffered ({}) must be at least the batch size ({})",
                self.max_buffered, self.batch_size
            )));
        }
        Ok(())
    }
}
