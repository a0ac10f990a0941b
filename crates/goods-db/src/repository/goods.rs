//! # Goods Repository
//!
//! Postgres implementation of [`GoodsStore`].
//!
//! ## Locking
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who holds what, per transaction                      │
//! │                                                                         │
//! │  create        pg_advisory_xact_lock(PRIORITY_SPACE)                   │
//! │                 └── MAX(priority)+1 ──► INSERT                         │
//! │                                                                         │
//! │  reprioritize  pg_advisory_xact_lock(PRIORITY_SPACE)                   │
//! │                 └── SELECT ... FOR UPDATE (target)                     │
//! │                      └── UPDATE range ±1 ──► UPDATE target             │
//! │                                                                         │
//! │  update        SELECT ... FOR UPDATE (target) ──► UPDATE               │
//! │  delete        SELECT ... FOR UPDATE (target) ──► UPDATE removed       │
//! │                                                                         │
//! │  The advisory lock serialises everything that reads or rewrites the    │
//! │  global priority space; row locks serialise writers of one good.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only live (non-removed) goods can be locked, so update, delete and
//! reprioritize of a removed good report `NotFound`. `get` and `list`
//! still see removed goods.

use async_trait::async_trait;
use goods_core::priority::PriorityMove;
use goods_core::{Context, DeleteReceipt, Good, GoodInput, GoodsList, ListRequest, Meta};
use sqlx::PgConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::store::GoodsStore;

/// Advisory lock key guarding the global priority space ("goods" in ASCII).
pub const PRIORITY_SPACE_LOCK: i64 = 0x676f_6f64_73;

macro_rules! good_columns {
    () => {
        "id, project_id, name, COALESCE(description, '') AS description, priority, removed, created_at"
    };
}

const SELECT_GOOD: &str = concat!(
    "SELECT ",
    good_columns!(),
    " FROM goods WHERE id = $1 AND project_id = $2"
);

const LOCK_LIVE_GOOD: &str = "SELECT priority FROM goods \
     WHERE id = $1 AND project_id = $2 AND removed = FALSE FOR UPDATE";

const NEXT_PRIORITY: &str =
    "SELECT COALESCE(MAX(priority), 0) + 1 FROM goods WHERE removed = FALSE";

const INSERT_GOOD: &str = concat!(
    "INSERT INTO goods (project_id, name, description, priority) VALUES ($1, $2, $3, $4) RETURNING ",
    good_columns!()
);

const UPDATE_GOOD: &str = concat!(
    "UPDATE goods SET name = $1, description = COALESCE($2, description) \
     WHERE id = $3 AND project_id = $4 RETURNING ",
    good_columns!()
);

const MARK_REMOVED: &str = "UPDATE goods SET removed = TRUE \
     WHERE id = $1 AND project_id = $2 RETURNING id, project_id, removed";

const COUNT_GOODS: &str = "SELECT COUNT(*), COUNT(*) FILTER (WHERE removed) FROM goods";

const LIST_PAGE: &str = concat!(
    "SELECT ",
    good_columns!(),
    " FROM goods ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
);

const SHIFT_RANGE: &str = concat!(
    "UPDATE goods SET priority = priority + $1 \
     WHERE removed = FALSE AND id <> $2 AND priority BETWEEN $3 AND $4 RETURNING ",
    good_columns!()
);

const SET_PRIORITY: &str = concat!(
    "UPDATE goods SET priority = $1 WHERE id = $2 AND project_id = $3 RETURNING ",
    good_columns!()
);

// =============================================================================
// Statement helpers
// =============================================================================

async fn lock_priority_space(conn: &mut PgConnection) -> DbResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(PRIORITY_SPACE_LOCK)
        .execute(conn)
        .await?;
    Ok(())
}

/// Row-locks a live good and returns its current priority.
async fn lock_live_good(conn: &mut PgConnection, id: i32, project_id: i32) -> DbResult<i32> {
    sqlx::query_scalar::<_, i32>(LOCK_LIVE_GOOD)
        .bind(id)
        .bind(project_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::good_not_found(id, project_id))
}

// =============================================================================
// Statement bodies
// =============================================================================

async fn select_good(conn: &mut PgConnection, id: i32, project_id: i32) -> DbResult<Good> {
    sqlx::query_as::<_, Good>(SELECT_GOOD)
        .bind(id)
        .bind(project_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| DbError::good_not_found(id, project_id))
}

async fn create_in(
    conn: &mut PgConnection,
    project_id: i32,
    name: String,
    description: String,
) -> DbResult<Good> {
    lock_priority_space(&mut *conn).await?;

    let priority: i32 = sqlx::query_scalar(NEXT_PRIORITY)
        .fetch_one(&mut *conn)
        .await?;

    let good = sqlx::query_as::<_, Good>(INSERT_GOOD)
        .bind(project_id)
        .bind(name)
        .bind(description)
        .bind(priority)
        .fetch_one(&mut *conn)
        .await?;
    Ok(good)
}

async fn update_in(
    conn: &mut PgConnection,
    id: i32,
    project_id: i32,
    name: String,
    description: Option<String>,
) -> DbResult<Good> {
    lock_live_good(&mut *conn, id, project_id).await?;

    let good = sqlx::query_as::<_, Good>(UPDATE_GOOD)
        .bind(name)
        .bind(description)
        .bind(id)
        .bind(project_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(good)
}

async fn delete_in(conn: &mut PgConnection, id: i32, project_id: i32) -> DbResult<DeleteReceipt> {
    lock_live_good(&mut *conn, id, project_id).await?;

    let (id, project_id, removed) = sqlx::query_as::<_, (i32, i32, bool)>(MARK_REMOVED)
        .bind(id)
        .bind(project_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(DeleteReceipt {
        id,
        project_id,
        removed,
    })
}

async fn list_in(conn: &mut PgConnection, request: ListRequest) -> DbResult<GoodsList> {
    let ListRequest { limit, offset } = request;

    let (total, removed) = sqlx::query_as::<_, (i64, i64)>(COUNT_GOODS)
        .fetch_one(&mut *conn)
        .await?;

    let goods = sqlx::query_as::<_, Good>(LIST_PAGE)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

    Ok(GoodsList {
        meta: Meta {
            total,
            removed,
            limit,
            offset,
        },
        goods,
    })
}

async fn reprioritize_in(
    conn: &mut PgConnection,
    id: i32,
    project_id: i32,
    new_priority: i32,
) -> DbResult<Vec<Good>> {
    lock_priority_space(&mut *conn).await?;
    let current = lock_live_good(&mut *conn, id, project_id).await?;

    let plan = PriorityMove::plan(current, new_priority);
    let Some((lo, hi)) = plan.shift_range() else {
        return Err(DbError::SamePriority { priority: current });
    };

    let mut changed = sqlx::query_as::<_, Good>(SHIFT_RANGE)
        .bind(plan.delta())
        .bind(id)
        .bind(lo)
        .bind(hi)
        .fetch_all(&mut *conn)
        .await?;

    let target = sqlx::query_as::<_, Good>(SET_PRIORITY)
        .bind(plan.target())
        .bind(id)
        .bind(project_id)
        .fetch_one(&mut *conn)
        .await?;

    changed.push(target);
    changed.sort_by_key(|g| (g.priority, g.id));
    Ok(changed)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for goods.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.goods();
/// let good = repo.create(&ctx, 1, &GoodInput::new("one")).await?;
/// let moved = repo.reprioritize(&ctx, good.id, 1, 1).await?;
/// ```
#[derive(Debug, Clone)]
pub struct GoodsRepository {
    db: Database,
}

impl GoodsRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GoodsStore for GoodsRepository {
    async fn create(&self, ctx: &Context, project_id: i32, input: &GoodInput) -> DbResult<Good> {
        let db = &self.db;
        let name = input.name.clone();
        let description = input.description.clone().unwrap_or_default();

        let good = db
            .within_transaction(ctx, move |tx| async move {
                let mut conn = db.tx_from(&tx).await?;
                create_in(&mut conn, project_id, name, description).await
            })
            .await?;

        debug!(id = good.id, project_id, priority = good.priority, "good created");
        Ok(good)
    }

    /// Joins the transaction bound on `ctx`, if any, so uncommitted writes
    /// of the enclosing scope are visible.
    async fn get(&self, ctx: &Context, id: i32, project_id: i32) -> DbResult<Good> {
        let read = async {
            let mut conn = self.db.tx_from(ctx).await?;
            select_good(&mut conn, id, project_id).await
        };
        ctx.run(read).await?
    }

    async fn update(
        &self,
        ctx: &Context,
        id: i32,
        project_id: i32,
        input: &GoodInput,
    ) -> DbResult<Good> {
        let db = &self.db;
        let name = input.name.clone();
        let description = input.description.clone();

        db.within_transaction(ctx, move |tx| async move {
            let mut conn = db.tx_from(&tx).await?;
            update_in(&mut conn, id, project_id, name, description).await
        })
        .await
    }

    async fn delete(&self, ctx: &Context, id: i32, project_id: i32) -> DbResult<DeleteReceipt> {
        let db = &self.db;
        let receipt = db
            .within_transaction(ctx, move |tx| async move {
                let mut conn = db.tx_from(&tx).await?;
                delete_in(&mut conn, id, project_id).await
            })
            .await?;

        debug!(id, project_id, "good removed");
        Ok(receipt)
    }

    async fn list(&self, ctx: &Context, request: ListRequest) -> DbResult<GoodsList> {
        let db = &self.db;
        db.within_transaction(ctx, move |tx| async move {
            let mut conn = db.tx_from(&tx).await?;
            list_in(&mut conn, request).await
        })
        .await
    }

    async fn reprioritize(
        &self,
        ctx: &Context,
        id: i32,
        project_id: i32,
        new_priority: i32,
    ) -> DbResult<Vec<Good>> {
        let db = &self.db;
        let changed = db
            .within_transaction(ctx, move |tx| async move {
                let mut conn = db.tx_from(&tx).await?;
                reprioritize_in(&mut conn, id, project_id, new_priority).await
            })
            .await?;

        debug!(
            id,
            project_id,
            new_priority,
            affected = changed.len(),
            "good reprioritized"
        );
        Ok(changed)
    }
}
