use axum::{
    extract::{Path, State},
    Json,
};

use crate::ap_ledger::{self, VendorStatement};
use crate::error::AppResult;
use crate::routes::ApiResponse;
use crate::state::AppState;

pub async fn vendor_ledger(
    State(state): State<AppState>,
    Path(vendor_id): Path<i64>,
) -> AppResult<Json<ApiResponse<VendorStatement>>> {
    let mut conn = state.db()?;
    let statement = ap_ledger::vendor_statement(&mut conn, vendor_id)?;
    Ok(ApiResponse::ok(
        format!("{} ledger entries", statement.entries.len()),
        statement,
    ))
}
