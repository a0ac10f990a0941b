//! # Goods Audit: Event Pipeline
//!
//! Moves audit events from the write path into the analytical store.
//!
//! ## Module Structure
//! ```text
//! goods_audit
//! ├── config     - AuditConfig (subject, batch size, interval, cap)
//! ├── error      - AuditError, AuditResult
//! ├── publisher  - AuditPublisher trait, NatsPublisher
//! ├── batcher    - AuditBatcher (shared buffer, flush/requeue)
//! ├── consumer   - AuditConsumer, ConsumerHandle
//! └── sink       - AuditSink trait, ClickHouseSink
//! ```
//!
//! ## Wiring
//! ```rust,ignore
//! let client = goods_audit::connect("nats://localhost:4222", "goods-api").await?;
//! let publisher = NatsPublisher::new(client.clone(), &config.subject);
//!
//! let sink = Arc::new(ClickHouseSink::new(&ClickHouseConfig::from_dsn(dsn)?));
//! sink.ensure_schema().await?;
//! let batcher = AuditBatcher::new(sink, &config);
//! let messages = goods_audit::subscribe(&client, &config.subject).await?;
//! let handle = AuditConsumer::new(batcher, config.flush_interval).spawn(messages);
//! // ...
//! handle.shutdown().await?;
//! ```

pub mod batcher;
pub mod config;
pub mod consumer;
pub mod error;
pub mod publisher;
pub mod sink;

pub use batcher::AuditBatcher;
pub use config::AuditConfig;
pub use consumer::{subscribe, AuditConsumer, ConsumerHandle};
pub use error::{AuditError, AuditResult};
pub use publisher::{connect, encode, AuditPublisher, NatsPublisher};
pub use sink::{AuditSink, ClickHouseConfig, ClickHouseSink, GoodsLogRow};
