use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::Actor;
use crate::dispatches::{self, DispatchRequest};
use crate::error::AppResult;
use crate::models::Dispatch;
use crate::routes::ApiResponse;
use crate::state::AppState;
use crate::status::DispatchStatus;

#[derive(Debug, Serialize)]
pub struct CreatedDispatchResponse {
    pub id: i64,
    pub bill_ids: Vec<i64>,
}

pub async fn create_dispatch(
    State(state): State<AppState>,
    actor: Actor,
    Json(request): Json<DispatchRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedDispatchResponse>>)> {
    let mut conn = state.db()?;
    let created = dispatches::create_dispatch(&mut conn, &request, actor.user_id)?;

    let response = CreatedDispatchResponse {
        id: created.dispatch.id,
        bill_ids: created.bills.iter().map(|bill| bill.id).collect(),
    };
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("dispatch created", response),
    ))
}

#[derive(Debug, Deserialize)]
pub struct DispatchListQuery {
    pub status: DispatchStatus,
}

pub async fn list_dispatches(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<DispatchListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Dispatch>>>> {
    let mut conn = state.db()?;
    let rows = dispatches::list_for_user(&mut conn, actor.user_id, query.status)?;
    Ok(ApiResponse::ok(format!("{} dispatches", rows.len()), rows))
}

pub async fn get_dispatch(
    State(state): State<AppState>,
    Path(dispatch_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Dispatch>>> {
    let mut conn = state.db()?;
    let dispatch = dispatches::get_dispatch(&mut conn, dispatch_id)?;
    Ok(ApiResponse::ok("dispatch found", dispatch))
}

pub async fn update_dispatch(
    State(state): State<AppState>,
    Path(dispatch_id): Path<i64>,
    Json(request): Json<DispatchRequest>,
) -> AppResult<Json<ApiResponse<Dispatch>>> {
    let mut conn = state.db()?;
    let dispatch = dispatches::update_dispatch(&mut conn, dispatch_id, &request)?;
    Ok(ApiResponse::ok("dispatch updated", dispatch))
}

pub async fn delete_dispatch(
    State(state): State<AppState>,
    Path(dispatch_id): Path<i64>,
) -> AppResult<Json<ApiResponse<i64>>> {
    let mut conn = state.db()?;
    dispatches::delete_dispatch(&mut conn, dispatch_id)?;
    Ok(ApiResponse::ok("dispatch deleted", dispatch_id))
}
