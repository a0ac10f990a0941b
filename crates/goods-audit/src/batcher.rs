//! # Audit Batcher
//!
//! The process-wide buffer between the subscription and the sink.
//!
//! ## Flush Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  push(event) ──► lock buffer ──► append ──► len >= batch_size? ──┐     │
//! │                                                                   │     │
//! │  flush():                                                         ▼     │
//! │    1. lock flush_lock          (one flush at a time)                    │
//! │    2. lock buffer, take all, unlock                                     │
//! │    3. sink.write_batch(batch)  (buffer NOT locked, pushes continue)     │
//! │    4a. Ok  → done, size trigger armed                                   │
//! │    4b. Err → lock buffer, put batch back in front, trim to cap,         │
//! │              size trigger disarmed until a flush succeeds               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! While the sink is failing only the interval ticker retries, so a burst of
//! events does not turn into one full-buffer write attempt per event.
//!
//! A crash loses whatever is buffered: at most one batch or one interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use goods_core::AuditEvent;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::AuditConfig;
use crate::error::AuditResult;
use crate::sink::AuditSink;

struct Inner {
    sink: Arc<dyn AuditSink>,
    buffer: Mutex<Vec<AuditEvent>>,
    flush_lock: Mutex<()>,
    /// Set after a failed write, cleared by the next successful one.
    backing_off: AtomicBool,
    batch_size: usize,
    max_buffered: usize,
}

/// Shared handle to the audit buffer. Clones see the same buffer.
#[derive(Clone)]
pub struct AuditBatcher {
    inner: Arc<Inner>,
}

impl AuditBatcher {
    pub fn new(sink: Arc<dyn AuditSink>, config: &AuditConfig) -> Self {
        AuditBatcher {
            inner: Arc::new(Inner {
                sink,
                buffer: Mutex::new(Vec::with_capacity(config.batch_size)),
                flush_lock: Mutex::new(()),
                backing_off: AtomicBool::new(false),
                batch_size: config.batch_size.max(1),
                max_buffered: config.max_buffered.max(config.batch_size),
            }),
        }
    }

    /// Buffers `event`; returns `true` once the size trigger is reached.
    ///
    /// Never `true` while the last flush failed.
    pub async fn push(&self, event: AuditEvent) -> bool {
        let mut buffer = self.inner.buffer.lock().await;
        buffer.push(event);
        let dropped = trim_oldest(&mut buffer, self.inner.max_buffered);
        if dropped > 0 {
            warn!(
                dropped,
                cap = self.inner.max_buffered,
                "audit buffer full, dropped oldest events"
            );
        }
        buffer.len() >= self.inner.batch_size && !self.inner.backing_off.load(Ordering::Acquire)
    }

    /// Number of events waiting for the next flush.
    pub async fn len(&self) -> usize {
        self.inner.buffer.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Writes everything buffered as one batch.
    ///
    /// Returns the number of events written. On failure the events go back
    /// to the front of the buffer for the next trigger.
    pub async fn flush(&self) -> AuditResult<usize> {
        let _flushing = self.inner.flush_lock.lock().await;

        let batch = {
            let mut buffer = self.inner.buffer.lock().await;
            if buffer.is_empty() {
                return Ok(0);
            }
            std::mem::take(&mut *buffer)
        };

        match self.inner.sink.write_batch(&batch).await {
            Ok(()) => {
                self.inner.backing_off.store(false, Ordering::Release);
                info!(count = batch.len(), "audit batch flushed");
                Ok(batch.len())
            }
            Err(err) => {
                self.inner.backing_off.store(true, Ordering::Release);
                error!(error = %err, count = batch.len(), "audit batch flush failed, will retry");
                self.requeue(batch).await;
                Err(err)
            }
        }
    }

    async fn requeue(&self, mut batch: Vec<AuditEvent>) {
        let mut buffer = self.inner.buffer.lock().await;
        batch.append(&mut buffer);
        *buffer = batch;

        let dropped = trim_oldest(&mut buffer, self.inner.max_buffered);
        if dropped > 0 {
            warn!(
                dropped,
                cap = self.inner.max_buffered,
                "audit buffer over cap after failed flush"
            );
        }
    }
}

/// Drops events from the front until at most `cap` remain.
fn trim_oldest(buffer: &mut Vec<AuditEvent>, cap: usize) -> usize {
    let overflow = buffer.len().saturating_sub(cap);
    if overflow > 0 {
        buffer.drain(..overflow);
    }
    overflow
}

// =============================================================================
// Unit Tests
// =============================================================================
