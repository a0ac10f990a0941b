//! # Read Cache
//!
//! String-keyed cache in front of the goods store. Not authoritative:
//! entries expire after the TTL and every mutation deletes what it touched.
//!
//! ## Key Space
//! ```text
//! good:{id}:{project_id}        → Good JSON               (TTL)
//! goods:list:{limit}:{offset}   → GoodsList JSON          (TTL)
//! goods:list:keys               → SET of live list keys   (TTL, refreshed)
//! ```
//!
//! Redis has no wildcard delete, so list keys are enumerated through the
//! `goods:list:keys` index set instead of a `goods:list:*` pattern.

use std::time::Duration;

use async_trait::async_trait;
use goods_core::{Context, ContextError};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

/// Index set listing every cached list page.
pub const LIST_INDEX_KEY: &str = "goods:list:keys";

pub fn good_key(id: i32, project_id: i32) -> String {
    format!("good:{id}:{project_id}")
}

pub fn list_key(limit: i64, offset: i64) -> String {
    format!("goods:list:{limit}:{offset}")
}

/// Cache failures. The service logs and swallows every one of them.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error(transparent)]
    Context(#[from] ContextError),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[async_trait]
pub trait Cache: Send + Sync {
    /// `None` on a miss.
    async fn get(&self, ctx: &Context, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, ctx: &Context, key: &str, value: String, ttl: Duration)
        -> CacheResult<()>;

    async fn delete(&self, ctx: &Context, keys: &[String]) -> CacheResult<()>;

    /// Records `key` in the index set `index`, which expires after `ttl`.
    async fn track(&self, ctx: &Context, index: &str, key: &str, ttl: Duration)
        -> CacheResult<()>;

    /// Members of the index set `index`.
    async fn tracked(&self, ctx: &Context, index: &str) -> CacheResult<Vec<String>>;
}

// =============================================================================
// Redis
// =============================================================================

/// [`Cache`] over a multiplexed, auto-reconnecting Redis connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("connected to Redis");
        Ok(RedisCache { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, ctx: &Context, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = ctx.run(conn.get(key)).await??;
        Ok(value)
    }

    async fn set(
        &self,
        ctx: &Context,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        ctx.run(conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1)))
            .await??;
        Ok(())
    }

    async fn delete(&self, ctx: &Context, keys: &[String]) -> CacheResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        ctx.run(conn.del::<_, ()>(keys.to_vec())).await??;
        Ok(())
    }

    async fn track(
        &self,
        ctx: &Context,
        index: &str,
        key: &str,
        ttl: Duration,
    ) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        let secs = i64::try_from(ttl.as_secs().max(1)).unwrap_or(i64::MAX);
        let mut pipe = redis::pipe();
        pipe.atomic()
            .sadd(index, key)
            .ignore()
            .expire(index, secs)
            .ignore();
        ctx.run(pipe.query_async::<()>(&mut conn)).await??;
        Ok(())
    }

    async fn tracked(&self, ctx: &Context, index: &str) -> CacheResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = ctx.run(conn.smembers(index)).await??;
        Ok(members)
    }
}

// =============================================================================
// Null
// =============================================================================

/// Always misses. Used when Redis is unreachable at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

#[async_trait]
impl Cache for NullCache {
    async fn get(&self, _ctx: &Context, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _: &Context, _: &str, _: String, _: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _ctx: &Context, _keys: &[String]) -> CacheResult<()> {
        Ok(())
    }

    async fn track(&self, _: &Context, _: &str, _: &str, _: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn tracked(&self, _ctx: &Context, _index: &str) -> CacheResult<Vec<String>> {
        Ok(Vec::new())
    }
}
