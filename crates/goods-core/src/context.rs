//! # Request Context
//!
//! Every store and cache call takes a [`Context`]: a cancellation token plus
//! an optional deadline. [`Context::run`] races the I/O future against both.
//!
//! ```text
//!   HTTP request ──► Context::with_timeout(10s)
//!                        │
//!          ┌─────────────┼──────────────┐
//!          ▼             ▼              ▼
//!      ctx.run(db)   ctx.run(redis)  ctx.run(...)
//!          │
//!          ├── fut finished   → Ok(output)
//!          ├── token fired    → Err(Cancelled)
//!          └── deadline hit   → Err(DeadlineExceeded)
//! ```
//!
//! Losing the race drops the I/O future. For a sqlx transaction that means
//! the transaction is rolled back.
//!
//! A context can also carry typed values ([`Context::with_value`]). The store
//! uses this to bind an open transaction so nested calls join it.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ContextError;

type Value = Arc<dyn Any + Send + Sync>;

/// Cancellation, deadline and request-scoped values carried through one unit of work.
#[derive(Clone)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    values: Vec<Value>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("deadline", &self.deadline)
            .field("values", &self.values.len())
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
            values: Vec::new(),
        }
    }

    /// A fresh context expiring `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
            values: Vec::new(),
        }
    }

    /// Child that is cancelled with `self` and expires no later than `self`.
    pub fn child(&self, timeout: Option<Duration>) -> Self {
        let own = timeout.map(|t| Instant::now() + t);
        let deadline = match (self.deadline, own) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            cancel: self.cancel.child_token(),
            deadline,
            values: self.values.clone(),
        }
    }

    /// Copy of `self` that also carries `value`. Shares the cancel token.
    ///
    /// A later value of the same type shadows an earlier one.
    pub fn with_value<T: Any + Send + Sync>(&self, value: Arc<T>) -> Self {
        let mut ctx = self.clone();
        ctx.values.push(value);
        ctx
    }

    /// Most recently attached value of type `T`.
    pub fn value<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.values
            .iter()
            .rev()
            .find_map(|v| Arc::clone(v).downcast::<T>().ok())
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Checks the context without awaiting anything.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.cancel.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Drives `fut` to completion unless the context is cancelled or expires first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ContextError::Cancelled),
            _ = deadline => Err(ContextError::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = Context::background();
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let ctx = Context::background();
        ctx.cancel();
        assert_eq!(
            ctx.run(async { 7 }).await,
            Err(ContextError::Cancelled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let ctx = Context::with_timeout(Duration::from_millis(50));
        let slow = tokio::time::sleep(Duration::from_secs(5));
        assert_eq!(ctx.run(slow).await, Err(ContextError::DeadlineExceeded));
        assert_eq!(ctx.check(), Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_run() {
        let ctx = Context::background();
        let trigger = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let out = ctx
            .run(tokio::time::sleep(Duration::from_secs(60)))
            .await;
        assert_eq!(out, Err(ContextError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_inherits_cancel_and_tighter_deadline() {
        let parent = Context::with_timeout(Duration::from_secs(1));
        let child = parent.child(Some(Duration::from_secs(30)));
        assert_eq!(child.deadline(), parent.deadline());

        let tighter = parent.child(Some(Duration::from_millis(10)));
        assert!(tighter.deadline() < parent.deadline());

        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[derive(Debug, PartialEq)]
    struct Tenant(&'static str);

    #[test]
    fn test_values_are_scoped_and_shadowed() {
        let root = Context::background();
        let outer = root.with_value(Arc::new(Tenant("outer")));
        let inner = outer.with_value(Arc::new(Tenant("inner")));

        assert!(root.value::<Tenant>().is_none());
        assert_eq!(*outer.value::<Tenant>().unwrap(), Tenant("outer"));
        assert_eq!(*inner.value::<Tenant>().unwrap(), Tenant("inner"));
        assert!(inner.value::<String>().is_none());

        let child = inner.child(Some(Duration::from_secs(1)));
        assert_eq!(*child.value::<Tenant>().unwrap(), Tenant("inner"));

        inner.cancel();
        assert!(root.is_cancelled());
    }
}
