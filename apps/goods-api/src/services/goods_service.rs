//! Goods service implementation.
//!
//! Orchestrates one operation end to end:
//!
//! ```text
//! validate ──► store ──► cache (fill or invalidate) ──► audit publish
//!    │           │              │                          │
//!   400     404 / 400 / 500   warn only                 warn only
//! ```
//!
//! Cache and bus failures never fail a request.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use goods_audit::AuditPublisher;
use goods_core::priority::sort_entries;
use goods_core::validation::{validate_address, validate_good_name, validate_positive};
use goods_core::{
    AuditEvent, Context, CoreError, CoreResult, DeleteReceipt, Good, GoodInput, GoodsList,
    ListRequest, Operation, PriorityList,
};
use goods_db::{DbError, GoodsStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{good_key, list_key, Cache, LIST_INDEX_KEY};

/// Goods service.
#[derive(Clone)]
pub struct GoodsService {
    store: Arc<dyn GoodsStore>,
    cache: Arc<dyn Cache>,
    publisher: Arc<dyn AuditPublisher>,
    cache_ttl: Duration,
}

impl GoodsService {
    pub fn new(
        store: Arc<dyn GoodsStore>,
        cache: Arc<dyn Cache>,
        publisher: Arc<dyn AuditPublisher>,
        cache_ttl: Duration,
    ) -> Self {
        GoodsService {
            store,
            cache,
            publisher,
            cache_ttl,
        }
    }

    pub async fn create(
        &self,
        ctx: &Context,
        project_id: i32,
        input: GoodInput,
    ) -> CoreResult<Good> {
        validate_positive("projectId", project_id)?;
        validate_good_name(&input.name)?;

        let good = self
            .store
            .create(ctx, project_id, &input)
            .await
            .map_err(|e| classify(e, 0, project_id))?;
        info!(id = good.id, project_id, priority = good.priority, "good created");

        self.invalidate(ctx, Vec::new()).await;
        self.audit(AuditEvent::from_good(Operation::Create, &good, Utc::now()))
            .await;
        Ok(good)
    }

    /// Cache first; a hit is audited like a store read.
    pub async fn get(&self, ctx: &Context, id: i32, project_id: i32) -> CoreResult<Good> {
        validate_address(id, project_id)?;

        let key = good_key(id, project_id);
        let good = match self.cached::<Good>(ctx, &key).await {
            Some(good) => good,
            None => {
                let good = self
                    .store
                    .get(ctx, id, project_id)
                    .await
                    .map_err(|e| classify(e, id, project_id))?;
                self.fill(ctx, &key, &good).await;
                good
            }
        };

        self.audit(AuditEvent::from_good(Operation::Get, &good, Utc::now()))
            .await;
        Ok(good)
    }

    pub async fn update(
        &self,
        ctx: &Context,
        id: i32,
        project_id: i32,
        input: GoodInput,
    ) -> CoreResult<Good> {
        validate_address(id, project_id)?;
        validate_good_name(&input.name)?;

        let good = self
            .store
            .update(ctx, id, project_id, &input)
            .await
            .map_err(|e| classify(e, id, project_id))?;
        info!(id, project_id, "good updated");

        self.invalidate(ctx, vec![good_key(id, project_id)]).await;
        self.audit(AuditEvent::from_good(Operation::Update, &good, Utc::now()))
            .await;
        Ok(good)
    }

    pub async fn delete(
        &self,
        ctx: &Context,
        id: i32,
        project_id: i32,
    ) -> CoreResult<DeleteReceipt> {
        validate_address(id, project_id)?;

        let receipt = self
            .store
            .delete(ctx, id, project_id)
            .await
            .map_err(|e| classify(e, id, project_id))?;
        info!(id, project_id, "good removed");

        self.invalidate(ctx, vec![good_key(id, project_id)]).await;
        self.audit(AuditEvent::from_receipt(&receipt, Utc::now()))
            .await;
        Ok(receipt)
    }

    /// Not audited.
    pub async fn list(&self, ctx: &Context, request: ListRequest) -> CoreResult<GoodsList> {
        let request = request.normalized();
        let key = list_key(request.limit, request.offset);

        if let Some(list) = self.cached::<GoodsList>(ctx, &key).await {
            return Ok(list);
        }

        let list = self
            .store
            .list(ctx, request)
            .await
            .map_err(|e| classify(e, 0, 0))?;

        self.fill(ctx, &key, &list).await;
        if let Err(err) = self
            .cache
            .track(ctx, LIST_INDEX_KEY, &key, self.cache_ttl)
            .await
        {
            warn!(error = %err, key = %key, "failed to index cached list page");
        }
        Ok(list)
    }

    /// Emits one audit event per good whose priority changed.
    pub async fn reprioritize(
        &self,
        ctx: &Context,
        id: i32,
        project_id: i32,
        new_priority: i32,
    ) -> CoreResult<PriorityList> {
        validate_address(id, project_id)?;
        validate_positive("newPriority", new_priority)?;

        let changed = self
            .store
            .reprioritize(ctx, id, project_id, new_priority)
            .await
            .map_err(|e| classify(e, id, project_id))?;
        info!(id, project_id, new_priority, affected = changed.len(), "good reprioritized");

        let mut keys = vec![good_key(id, project_id)];
        keys.extend(
            changed
                .iter()
                .filter(|g| g.id != id || g.project_id != project_id)
                .map(|g| good_key(g.id, g.project_id)),
        );
        self.invalidate(ctx, keys).await;

        let at = Utc::now();
        for good in &changed {
            self.audit(AuditEvent::from_good(Operation::Reprioritize, good, at))
                .await;
        }

        let mut priorities: Vec<_> = changed.iter().map(Good::priority_entry).collect();
        sort_entries(&mut priorities);
        Ok(PriorityList { priorities })
    }

    // =========================================================================
    // Cache and audit helpers
    // =========================================================================

    /// A miss, a cache error and an undecodable entry all read as `None`.
    async fn cached<T: DeserializeOwned>(&self, ctx: &Context, key: &str) -> Option<T> {
        match self.cache.get(ctx, key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(key, "cache hit");
                    Some(value)
                }
                Err(err) => {
                    warn!(error = %err, key, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, key, "cache read failed");
                None
            }
        }
    }

    async fn fill<T: Serialize>(&self, ctx: &Context, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, key, "failed to encode cache entry");
                return;
            }
        };
        if let Err(err) = self.cache.set(ctx, key, raw, self.cache_ttl).await {
            warn!(error = %err, key, "cache write failed");
        }
    }

    /// Deletes `keys`, every indexed list page and the index itself.
    async fn invalidate(&self, ctx: &Context, mut keys: Vec<String>) {
        match self.cache.tracked(ctx, LIST_INDEX_KEY).await {
            Ok(pages) => keys.extend(pages),
            Err(err) => warn!(error = %err, "failed to read list page index"),
        }
        keys.push(LIST_INDEX_KEY.to_string());

        if let Err(err) = self.cache.delete(ctx, &keys).await {
            warn!(error = %err, keys = keys.len(), "cache invalidation failed");
        }
    }

    async fn audit(&self, event: AuditEvent) {
        if let Err(err) = self.publisher.publish(&event).await {
            warn!(
                error = %err,
                operation = %event.operation,
                good_id = event.good_id,
                "failed to publish audit event"
            );
        }
    }
}

/// Maps store failures onto what the client is told.
fn classify(err: DbError, id: i32, project_id: i32) -> CoreError {
    match err {
        DbError::NotFound { .. } => CoreError::GoodNotFound { id, project_id },
        DbError::SamePriority { priority } => CoreError::SamePriority { priority },
        other => CoreError::Internal(other.to_string()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::tests::MemoryCache;
    use async_trait::async_trait;
    use goods_audit::{AuditError, AuditResult};
    use goods_core::priority::PriorityMove;
    use goods_core::{Meta, ValidationError};
    use goods_db::DbResult;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    /// In-memory store following the same priority rules as Postgres.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        goods: Mutex<Vec<Good>>,
        pub reads: AtomicUsize,
        pub broken: AtomicBool,
    }

    impl MemoryStore {
        fn check(&self) -> DbResult<()> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(DbError::ConnectionFailed("connection refused".into()));
            }
            Ok(())
        }

        pub fn snapshot(&self) -> Vec<Good> {
            self.goods.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GoodsStore for MemoryStore {
        async fn create(&self, _: &Context, project_id: i32, input: &GoodInput) -> DbResult<Good> {
            self.check()?;
            let mut goods = self.goods.lock().unwrap();
            let priority = goods
                .iter()
                .filter(|g| !g.removed)
                .map(|g| g.priority)
                .max()
                .unwrap_or(0)
                + 1;
            let good = Good {
                id: goods.len() as i32 + 1,
                project_id,
                name: input.name.clone(),
                description: input.description.clone().unwrap_or_default(),
                priority,
                removed: false,
                created_at: Utc::now(),
            };
            goods.push(good.clone());
            Ok(good)
        }

        async fn get(&self, _: &Context, id: i32, project_id: i32) -> DbResult<Good> {
            self.check()?;
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.goods
                .lock()
                .unwrap()
                .iter()
                .find(|g| g.id == id && g.project_id == project_id)
                .cloned()
                .ok_or_else(|| DbError::good_not_found(id, project_id))
        }

        async fn update(
            &self,
            _: &Context,
            id: i32,
            project_id: i32,
            input: &GoodInput,
        ) -> DbResult<Good> {
            self.check()?;
            let mut goods = self.goods.lock().unwrap();
            let good = goods
                .iter_mut()
                .find(|g| g.id == id && g.project_id == project_id && !g.removed)
                .ok_or_else(|| DbError::good_not_found(id, project_id))?;
            good.name = input.name.clone();
            if let Some(description) = &input.description {
                good.description = description.clone();
            }
            Ok(good.clone())
        }

        async fn delete(&self, _: &Context, id: i32, project_id: i32) -> DbResult<DeleteReceipt> {
            self.check()?;
            let mut goods = self.goods.lock().unwrap();
            let good = goods
                .iter_mut()
                .find(|g| g.id == id && g.project_id == project_id && !g.removed)
                .ok_or_else(|| DbError::good_not_found(id, project_id))?;
            good.removed = true;
            Ok(DeleteReceipt {
                id,
                project_id,
                removed: true,
            })
        }

        async fn list(&self, _: &Context, request: ListRequest) -> DbResult<GoodsList> {
            self.check()?;
            self.reads.fetch_add(1, Ordering::SeqCst);
            let mut goods = self.snapshot();
            goods.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
            let meta = Meta {
                total: goods.len() as i64,
                removed: goods.iter().filter(|g| g.removed).count() as i64,
                limit: request.limit,
                offset: request.offset,
            };
            let goods = goods
                .into_iter()
                .skip(request.offset as usize)
                .take(request.limit as usize)
                .collect();
            Ok(GoodsList { meta, goods })
        }

        async fn reprioritize(
            &self,
            _: &Context,
            id: i32,
            project_id: i32,
            new_priority: i32,
        ) -> DbResult<Vec<Good>> {
            self.check()?;
            let mut goods = self.goods.lock().unwrap();
            let current = goods
                .iter()
                .find(|g| g.id == id && g.project_id == project_id && !g.removed)
                .map(|g| g.priority)
                .ok_or_else(|| DbError::good_not_found(id, project_id))?;

            let plan = PriorityMove::plan(current, new_priority);
            if let PriorityMove::Unchanged { priority } = plan {
                return Err(DbError::SamePriority { priority });
            }

            let mut changed = Vec::new();
            for good in goods.iter_mut().filter(|g| !g.removed) {
                let next = if good.id == id {
                    plan.target()
                } else {
                    plan.shifted(good.priority)
                };
                if next != good.priority || good.id == id {
                    good.priority = next;
                    changed.push(good.clone());
                }
            }
            // Storage order, not priority order.
            Ok(changed)
        }
    }

    /// Publisher that records events and can be told to fail.
    #[derive(Default)]
    pub(crate) struct RecordingPublisher {
        pub events: Mutex<Vec<AuditEvent>>,
        pub failing: AtomicBool,
    }

    impl RecordingPublisher {
        pub fn operations(&self) -> Vec<Operation> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.operation)
                .collect()
        }
    }

    #[async_trait]
    impl AuditPublisher for RecordingPublisher {
        async fn publish(&self, event: &AuditEvent) -> AuditResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(AuditError::Publish("no responders".into()));
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    pub(crate) struct Harness {
        pub service: GoodsService,
        pub store: Arc<MemoryStore>,
        pub cache: Arc<MemoryCache>,
        pub publisher: Arc<RecordingPublisher>,
    }

    pub(crate) fn harness() -> Harness {
        let store = Arc::new(MemoryStore::default());
        let cache = Arc::new(MemoryCache::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let service = GoodsService::new(
            store.clone(),
            cache.clone(),
            publisher.clone(),
            Duration::from_secs(60),
        );
        Harness {
            service,
            store,
            cache,
            publisher,
        }
    }

    fn ctx() -> Context {
        Context::background()
    }

    // -------------------------------------------------------------------------
    // Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_assigns_next_priority_and_audits() {
        let h = harness();
        let a = h.service.create(&ctx(), 1, GoodInput::new("a")).await.unwrap();
        let b = h.service.create(&ctx(), 1, GoodInput::new("b")).await.unwrap();

        assert_eq!((a.priority, b.priority), (1, 2));
        assert_eq!(h.publisher.operations(), vec![Operation::Create, Operation::Create]);
    }

    #[tokio::test]
    async fn test_validation_happens_before_store() {
        let h = harness();
        h.store.broken.store(true, Ordering::SeqCst);

        let err = h.service.create(&ctx(), 1, GoodInput::new("  ")).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { .. })
        ));

        let err = h.service.get(&ctx(), 0, 1).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBePositive { ref field }) if field == "id"
        ));

        let err = h.service.reprioritize(&ctx(), 1, 1, 0).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_populates_cache_and_hit_is_audited() {
        let h = harness();
        let good = h.service.create(&ctx(), 1, GoodInput::new("a")).await.unwrap();

        h.service.get(&ctx(), good.id, 1).await.unwrap();
        assert!(h.cache.contains(&good_key(good.id, 1)));
        let again = h.service.get(&ctx(), good.id, 1).await.unwrap();

        assert_eq!(again, good);
        assert_eq!(h.store.reads.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.publisher.operations(),
            vec![Operation::Create, Operation::Get, Operation::Get]
        );
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let h = harness();
        let err = h.service.get(&ctx(), 99, 1).await.unwrap_err();
        assert!(matches!(err, CoreError::GoodNotFound { id: 99, project_id: 1 }));
        assert!(h.publisher.operations().is_empty());
    }

    #[tokio::test]
    async fn test_update_invalidates_good_and_lists() {
        let h = harness();
        let good = h.service.create(&ctx(), 1, GoodInput::new("a")).await.unwrap();
        h.service.get(&ctx(), good.id, 1).await.unwrap();
        h.service.list(&ctx(), ListRequest::default()).await.unwrap();
        assert!(h.cache.contains("goods:list:10:0"));

        let updated = h
            .service
            .update(&ctx(), good.id, 1, GoodInput::new("renamed"))
            .await
            .unwrap();

        assert_eq!(updated.name, "renamed");
        assert!(!h.cache.contains(&good_key(good.id, 1)));
        assert!(!h.cache.contains("goods:list:10:0"));
        let fresh = h.service.get(&ctx(), good.id, 1).await.unwrap();
        assert_eq!(fresh.name, "renamed");
    }

    #[tokio::test]
    async fn test_create_invalidates_lists() {
        let h = harness();
        h.service.create(&ctx(), 1, GoodInput::new("a")).await.unwrap();
        let first = h.service.list(&ctx(), ListRequest::default()).await.unwrap();
        assert_eq!(first.meta.total, 1);

        h.service.create(&ctx(), 1, GoodInput::new("b")).await.unwrap();
        let second = h.service.list(&ctx(), ListRequest::default()).await.unwrap();
        assert_eq!(second.meta.total, 2);
    }

    #[tokio::test]
    async fn test_list_normalizes_and_is_not_audited() {
        let h = harness();
        h.service.create(&ctx(), 1, GoodInput::new("a")).await.unwrap();

        let list = h.service.list(&ctx(), ListRequest::new(-1, -5)).await.unwrap();
        assert_eq!((list.meta.limit, list.meta.offset), (10, 0));
        h.service.list(&ctx(), ListRequest::new(0, 0)).await.unwrap();

        assert_eq!(h.store.reads.load(Ordering::SeqCst), 1);
        assert_eq!(h.publisher.operations(), vec![Operation::Create]);
    }

    #[tokio::test]
    async fn test_delete_twice_and_audit_shape() {
        let h = harness();
        let good = h
            .service
            .create(&ctx(), 1, GoodInput::new("a").with_description("d"))
            .await
            .unwrap();

        let receipt = h.service.delete(&ctx(), good.id, 1).await.unwrap();
        assert!(receipt.removed);
        let err = h.service.delete(&ctx(), good.id, 1).await.unwrap_err();
        assert!(matches!(err, CoreError::GoodNotFound { .. }));

        let events = h.publisher.events.lock().unwrap();
        let delete = events.last().unwrap();
        assert_eq!(delete.operation, Operation::Delete);
        assert!(delete.removed);
        assert_eq!(delete.name, "");
        assert_eq!(delete.priority, 0);
    }

    #[tokio::test]
    async fn test_reprioritize_promotion_scenario() {
        let h = harness();
        for name in ["a", "b", "c"] {
            h.service.create(&ctx(), 1, GoodInput::new(name)).await.unwrap();
        }

        let result = h.service.reprioritize(&ctx(), 3, 1, 1).await.unwrap();
        let pairs: Vec<(i32, i32)> = result.priorities.iter().map(|e| (e.id, e.priority)).collect();
        assert_eq!(pairs, vec![(3, 1), (1, 2), (2, 3)]);

        let reprioritized = h
            .publisher
            .operations()
            .into_iter()
            .filter(|op| *op == Operation::Reprioritize)
            .count();
        assert_eq!(reprioritized, 3);
    }

    #[tokio::test]
    async fn test_reprioritize_invalidates_every_affected_good() {
        let h = harness();
        for name in ["a", "b", "c"] {
            h.service.create(&ctx(), 1, GoodInput::new(name)).await.unwrap();
        }
        for id in 1..=3 {
            h.service.get(&ctx(), id, 1).await.unwrap();
        }

        h.service.reprioritize(&ctx(), 1, 1, 3).await.unwrap();

        for id in 1..=3 {
            assert!(!h.cache.contains(&good_key(id, 1)), "good {id} still cached");
        }
        assert_eq!(h.service.get(&ctx(), 2, 1).await.unwrap().priority, 1);
    }

    #[tokio::test]
    async fn test_same_priority_is_rejected() {
        let h = harness();
        h.service.create(&ctx(), 1, GoodInput::new("a")).await.unwrap();
        let err = h.service.reprioritize(&ctx(), 1, 1, 1).await.unwrap_err();
        assert!(matches!(err, CoreError::SamePriority { priority: 1 }));
    }

    #[tokio::test]
    async fn test_cache_and_bus_failures_do_not_fail_requests() {
        let h = harness();
        h.cache.failing.store(true, Ordering::SeqCst);
        h.publisher.failing.store(true, Ordering::SeqCst);

        let good = h.service.create(&ctx(), 1, GoodInput::new("a")).await.unwrap();
        assert_eq!(h.service.get(&ctx(), good.id, 1).await.unwrap(), good);
        h.service.list(&ctx(), ListRequest::default()).await.unwrap();
        h.service
            .update(&ctx(), good.id, 1, GoodInput::new("b"))
            .await
            .unwrap();
        h.service.delete(&ctx(), good.id, 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_undecodable_cache_entry_is_a_miss() {
        let h = harness();
        let good = h.service.create(&ctx(), 1, GoodInput::new("a")).await.unwrap();
        h.cache.put_raw(&good_key(good.id, 1), "{broken");

        assert_eq!(h.service.get(&ctx(), good.id, 1).await.unwrap(), good);
        assert_eq!(h.store.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_internal() {
        let h = harness();
        h.store.broken.store(true, Ordering::SeqCst);
        let err = h.service.create(&ctx(), 1, GoodInput::new("a")).await.unwrap_err();
        assert!(matches!(err, CoreError::Internal(_)));
    }
}
