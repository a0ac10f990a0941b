//! # Audit Producer
//!
//! Publishes [`AuditEvent`]s as JSON onto the audit subject.
//!
//! Publishing only enqueues the message on the client's outbound buffer;
//! the service treats any error as a warning and carries on.

use async_trait::async_trait;
use bytes::Bytes;
use goods_core::AuditEvent;
use tracing::{debug, info};

use crate::error::{AuditError, AuditResult};

/// Anything that can take an audit event off the service's hands.
#[async_trait]
pub trait AuditPublisher: Send + Sync {
    async fn publish(&self, event: &AuditEvent) -> AuditResult<()>;

    /// Waits until everything published so far has left the process.
    async fn flush(&self) -> AuditResult<()> {
        Ok(())
    }
}

/// Encodes an event the way every consumer expects it on the wire.
pub fn encode(event: &AuditEvent) -> AuditResult<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(event)?))
}

/// Connects to NATS, naming the connection after the service.
pub async fn connect(url: &str, name: &str) -> AuditResult<async_nats::Client> {
    let client = async_nats::ConnectOptions::new()
        .name(name)
        .connect(url)
        .await?;
    info!(url, "connected to NATS");
    Ok(client)
}

// =============================================================================
// NATS
// =============================================================================

/// [`AuditPublisher`] over a shared NATS connection.
#[derive(Debug, Clone)]
pub struct NatsPublisher {
    client: async_nats::Client,
    subject: String,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client, subject: impl Into<String>) -> Self {
        Self {
            client,
            subject: subject.into(),
        }
    }

}

#[async_trait]
impl AuditPublisher for NatsPublisher {
    async fn publish(&self, event: &AuditEvent) -> AuditResult<()> {
        let payload = encode(event)?;
        self.client.publish(self.subject.clone(), payload).await?;
        debug!(
            subject = %self.subject,
            operation = %event.operation,
            good_id = event.good_id,
            "audit event published"
        );
        Ok(())
    }

    async fn flush(&self) -> AuditResult<()> {
        self.client
            .flush()
            .await
            .map_err(|e| AuditError::Publish(e.to_string()))
    }
}
