//! # GoodsStore capability
//!
//! The six operations the goods service needs from the authoritative store.
//! [`GoodsRepository`](crate::GoodsRepository) implements it over Postgres;
//! service tests substitute an in-memory fake.

use async_trait::async_trait;
use goods_core::{Context, DeleteReceipt, Good, GoodInput, GoodsList, ListRequest};

use crate::error::DbResult;

#[async_trait]
pub trait GoodsStore: Send + Sync {
    /// Inserts a live good at `MAX(priority) + 1`.
    async fn create(&self, ctx: &Context, project_id: i32, input: &GoodInput) -> DbResult<Good>;

    /// Any good, removed or not. `NotFound` when absent.
    async fn get(&self, ctx: &Context, id: i32, project_id: i32) -> DbResult<Good>;

    /// Renames a live good; a `None` description keeps the stored one.
    async fn update(
        &self,
        ctx: &Context,
        id: i32,
        project_id: i32,
        input: &GoodInput,
    ) -> DbResult<Good>;

    /// Soft-deletes a live good.
    async fn delete(&self, ctx: &Context, id: i32, project_id: i32) -> DbResult<DeleteReceipt>;

    /// One page ordered newest first, plus totals. `request` must be normalized.
    async fn list(&self, ctx: &Context, request: ListRequest) -> DbResult<GoodsList>;

    /// Moves a live good to `new_priority` and shifts the goods in between.
    ///
    /// Returns every changed good (target included) sorted by priority, then id.
    async fn reprioritize(
        &self,
        ctx: &Context,
        id: i32,
        project_id: i32,
        new_priority: i32,
    ) -> DbResult<Vec<Good>>;
}
