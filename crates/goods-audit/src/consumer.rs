//! # Audit Consumer
//!
//! Drains the audit subject into the [`AuditBatcher`].
//!
//! ## Tasks
//! ```text
//!   subscription ──► decode ──► batcher.push ──► size trigger? ──► flush
//!                      │
//!                      └── malformed: warn, drop
//!
//!   ticker (every flush_interval) ─────────────────────────────────► flush
//!
//!   shutdown: cancel both ──► take already-delivered messages ──► join
//!             ──► final flush
//!   drain:    flush publisher ──► shutdown
//! ```
//!
//! Both triggers go through [`AuditBatcher::flush`], which serializes
//! concurrent flushes, so a tick landing on a size flush just finds an
//! empty (or smaller) buffer.

use std::time::Duration;

use bytes::Bytes;
use futures_util::{FutureExt, Stream, StreamExt};
use goods_core::AuditEvent;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::batcher::AuditBatcher;
use crate::error::AuditResult;
use crate::publisher::AuditPublisher;

/// Subscribes to `subject` and yields raw payloads.
pub async fn subscribe(
    client: &async_nats::Client,
    subject: &str,
) -> AuditResult<impl Stream<Item = Bytes> + Send + 'static> {
    let subscriber = client.subscribe(subject.to_string()).await?;
    info!(subject, "subscribed to audit subject");
    Ok(subscriber.map(|message| message.payload))
}

pub struct AuditConsumer {
    batcher: AuditBatcher,
    flush_interval: Duration,
}

impl AuditConsumer {
    pub fn new(batcher: AuditBatcher, flush_interval: Duration) -> Self {
        Self {
            batcher,
            flush_interval,
        }
    }

    /// Starts the subscription and ticker tasks.
    pub fn spawn<S>(self, messages: S) -> ConsumerHandle
    where
        S: Stream<Item = Bytes> + Send + 'static,
    {
        let token = CancellationToken::new();

        let subscription = tokio::spawn(run_subscription(
            self.batcher.clone(),
            Box::pin(messages),
            token.clone(),
        ));
        let ticker = tokio::spawn(run_ticker(
            self.batcher.clone(),
            self.flush_interval,
            token.clone(),
        ));

        ConsumerHandle {
            token,
            tasks: vec![subscription, ticker],
            batcher: self.batcher,
        }
    }
}

async fn run_subscription<S>(batcher: AuditBatcher, mut messages: S, token: CancellationToken)
where
    S: Stream<Item = Bytes> + Send + Unpin,
{
    loop {
        let payload = tokio::select! {
            biased;
            _ = token.cancelled() => {
                while let Some(Some(payload)) = messages.next().now_or_never() {
                    accept(&batcher, payload).await;
                }
                break;
            }
            next = messages.next() => match next {
                Some(payload) => payload,
                None => {
                    warn!("audit subscription closed");
                    break;
                }
            },
        };
        accept(&batcher, payload).await;
    }
    debug!("audit subscription task stopped");
}

async fn accept(batcher: &AuditBatcher, payload: Bytes) {
    let event: AuditEvent = match serde_json::from_slice(&payload) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, bytes = payload.len(), "dropping malformed audit event");
            return;
        }
    };
    debug!(operation = %event.operation, good_id = event.good_id, "audit event received");

    if batcher.push(event).await {
        // Failure is logged by the batcher; events stay buffered.
        let _ = batcher.flush().await;
    }
}

async fn run_ticker(batcher: AuditBatcher, every: Duration, token: CancellationToken) {
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                // Logged by the batcher; the next tick retries.
                let _ = batcher.flush().await;
            }
        }
    }
    debug!("audit ticker task stopped");
}

/// Owns the running consumer tasks.
pub struct ConsumerHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    batcher: AuditBatcher,
}

impl ConsumerHandle {
    pub fn batcher(&self) -> &AuditBatcher {
        &self.batcher
    }

    /// Stops both tasks and flushes what is left.
    pub async fn shutdown(self) -> AuditResult<usize> {
        self.token.cancel();
        for task in self.tasks {
            if let Err(err) = task.await {
                error!(error = %err, "audit consumer task panicked");
            }
        }

        let flushed = self.batcher.flush().await?;
        info!(flushed, "audit consumer stopped");
        Ok(flushed)
    }

    /// Flushes `publisher` before shutting down, so events it still holds
    /// reach the subscription first.
    pub async fn drain<P>(self, publisher: &P) -> AuditResult<usize>
    where
        P: AuditPublisher + ?Sized,
    {
        if let Err(err) = publisher.flush().await {
            warn!(error = %err, "failed to flush audit publisher");
        }
        self.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batcher::tests::{event, RecordingSink};
    use crate::config::AuditConfig;
    use crate::error::AuditError;
    use crate::publisher::encode;
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::ReceiverStream;

    fn start(
        sink: &Arc<RecordingSink>,
        batch: usize,
    ) -> (mpsc::Sender<Bytes>, ConsumerHandle) {
        let config = AuditConfig::default().batch_size(batch);
        let batcher = AuditBatcher::new(sink.clone(), &config);
        let (tx, rx) = mpsc::channel(64);
        let handle =
            AuditConsumer::new(batcher, config.flush_interval).spawn(ReceiverStream::new(rx));
        (tx, handle)
    }

    async fn wait_for(mut done: impl FnMut() -> bool) {
        for _ in 0..100 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_trigger_flushes_without_waiting_for_tick() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, handle) = start(&sink, 3);

        for i in 1..=3 {
            tx.send(encode(&event(i)).unwrap()).await.unwrap();
        }
        wait_for(|| sink.rows() == 3).await;
        assert_eq!(sink.batches.lock().unwrap().len(), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_trigger_flushes_partial_batch() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, handle) = start(&sink, 30);

        for i in 1..=3 {
            tx.send(encode(&event(i)).unwrap()).await.unwrap();
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.rows(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.rows(), 3);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_payload_is_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, handle) = start(&sink, 30);

        tx.send(Bytes::from_static(b"{not json")).await.unwrap();
        tx.send(encode(&event(7)).unwrap()).await.unwrap();
        let batcher = handle.batcher().clone();
        for _ in 0..100 {
            if batcher.len().await == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(handle.shutdown().await.unwrap(), 1);
        assert_eq!(sink.batches.lock().unwrap()[0][0].good_id, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_retried_on_next_tick() {
        let sink = Arc::new(RecordingSink::default());
        sink.failing.store(true, Ordering::SeqCst);
        let (tx, handle) = start(&sink, 2);

        tx.send(encode(&event(1)).unwrap()).await.unwrap();
        tx.send(encode(&event(2)).unwrap()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.rows(), 0);
        assert_eq!(handle.batcher().len().await, 2);

        sink.failing.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(sink.rows(), 2);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_outage_does_not_retry_per_event() {
        let sink = Arc::new(RecordingSink::default());
        sink.failing.store(true, Ordering::SeqCst);
        let (tx, handle) = start(&sink, 30);

        for i in 1..=200 {
            tx.send(encode(&event(i)).unwrap()).await.unwrap();
        }
        let batcher = handle.batcher().clone();
        for _ in 0..100 {
            if batcher.len().await == 200 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(batcher.len().await, 200);
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);

        // Next tick retries once and writes everything in one batch.
        sink.failing.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(sink.rows(), 200);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_remaining() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, handle) = start(&sink, 30);

        tx.send(encode(&event(1)).unwrap()).await.unwrap();
        tx.send(encode(&event(2)).unwrap()).await.unwrap();
        drop(tx);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(handle.shutdown().await.unwrap(), 2);
        assert_eq!(sink.rows(), 2);
    }

    /// Publisher that holds events until flushed, then delivers them.
    struct BufferedPublisher {
        tx: mpsc::Sender<Bytes>,
        pending: StdMutex<Vec<Bytes>>,
    }

    #[async_trait]
    impl AuditPublisher for BufferedPublisher {
        async fn publish(&self, event: &AuditEvent) -> AuditResult<()> {
            self.pending.lock().unwrap().push(encode(event)?);
            Ok(())
        }

        async fn flush(&self) -> AuditResult<()> {
            let pending = std::mem::take(&mut *self.pending.lock().unwrap());
            for payload in pending {
                self.tx
                    .send(payload)
                    .await
                    .map_err(|e| AuditError::Publish(e.to_string()))?;
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_delivers_publisher_backlog_before_stopping() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, handle) = start(&sink, 30);
        let publisher = BufferedPublisher {
            tx,
            pending: StdMutex::new(Vec::new()),
        };

        publisher.publish(&event(1)).await.unwrap();
        publisher.publish(&event(2)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.batcher().is_empty().await);

        assert_eq!(handle.drain(&publisher).await.unwrap(), 2);
        assert_eq!(sink.rows(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_takes_messages_already_delivered() {
        let sink = Arc::new(RecordingSink::default());
        let (tx, handle) = start(&sink, 30);

        tx.send(encode(&event(1)).unwrap()).await.unwrap();
        tx.send(encode(&event(2)).unwrap()).await.unwrap();
        assert_eq!(handle.shutdown().await.unwrap(), 2);
        assert_eq!(sink.rows(), 2);
    }
}
