//! HTTP routes.
//!
//! Query parameters are decoded by hand so that a missing or non-numeric
//! `id`/`projectId` becomes a 400 with our error body, not axum's default.

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post};
use axum::{middleware, Extension, Json, Router};
use goods_core::validation::parse_param;
use goods_core::{
    DeleteReceipt, Good, GoodInput, GoodsList, ListRequest, PriorityList, ReprioritizeRequest,
    UserInfo, DEFAULT_LIST_LIMIT, DEFAULT_LIST_OFFSET,
};
use serde_json::json;
use tracing::debug;

use crate::auth::require_auth;
use crate::error::ApiResult;
use crate::AppState;

type Params = Query<HashMap<String, String>>;

/// Create the combined router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/good/create", post(create_good))
        .route("/good/get", get(get_good))
        .route("/good/update", patch(update_good))
        .route("/good/remove", delete(remove_good))
        .route("/goods/list", get(list_goods))
        .route("/good/reprioritize", patch(reprioritize_good))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .with_state(state)
}

fn param(params: &HashMap<String, String>, field: &str) -> ApiResult<i32> {
    Ok(parse_param(field, params.get(field).map(String::as_str))?)
}

/// `(id, projectId)` from the query string.
fn address(params: &HashMap<String, String>) -> ApiResult<(i32, i32)> {
    Ok((param(params, "id")?, param(params, "projectId")?))
}

/// Unparseable paging falls back to the defaults instead of failing.
fn paging(params: &HashMap<String, String>) -> ListRequest {
    let read = |field: &str, default: i64| {
        params
            .get(field)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    };
    ListRequest::new(
        read("limit", DEFAULT_LIST_LIMIT),
        read("offset", DEFAULT_LIST_OFFSET),
    )
}

async fn create_good(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(params): Params,
    body: Result<Json<GoodInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Good>)> {
    let project_id = param(&params, "projectId")?;
    let Json(input) = body?;
    debug!(user = %user.id, project_id, "create good");

    let good = state
        .service
        .create(&state.request_context(), project_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(good)))
}

async fn get_good(State(state): State<AppState>, Query(params): Params) -> ApiResult<Json<Good>> {
    let (id, project_id) = address(&params)?;
    let good = state
        .service
        .get(&state.request_context(), id, project_id)
        .await?;
    Ok(Json(good))
}

async fn update_good(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(params): Params,
    body: Result<Json<GoodInput>, JsonRejection>,
) -> ApiResult<Json<Good>> {
    let (id, project_id) = address(&params)?;
    let Json(input) = body?;
    debug!(user = %user.id, id, project_id, "update good");

    let good = state
        .service
        .update(&state.request_context(), id, project_id, input)
        .await?;
    Ok(Json(good))
}

async fn remove_good(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(params): Params,
) -> ApiResult<Json<DeleteReceipt>> {
    let (id, project_id) = address(&params)?;
    debug!(user = %user.id, id, project_id, "remove good");

    let receipt = state
        .service
        .delete(&state.request_context(), id, project_id)
        .await?;
    Ok(Json(receipt))
}

async fn list_goods(
    State(state): State<AppState>,
    Query(params): Params,
) -> ApiResult<Json<GoodsList>> {
    let list = state
        .service
        .list(&state.request_context(), paging(&params))
        .await?;
    Ok(Json(list))
}

async fn reprioritize_good(
    State(state): State<AppState>,
    Extension(user): Extension<UserInfo>,
    Query(params): Params,
    body: Result<Json<ReprioritizeRequest>, JsonRejection>,
) -> ApiResult<Json<PriorityList>> {
    let (id, project_id) = address(&params)?;
    let Json(request) = body?;
    debug!(
        user = %user.id,
        id,
        project_id,
        new_priority = request.new_priority,
        "reprioritize good"
    );

    let priorities = state
        .service
        .reprioritize(&state.request_context(), id, project_id, request.new_priority)
        .await?;
    Ok(Json(priorities))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = match &state.db {
        Some(db) => db.health_check().await,
        None => true,
    };
    if healthy {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable" })),
        )
    }
}
