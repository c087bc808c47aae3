use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::Actor;
use crate::cashbook::{
    self, CashEntryRequest, TransactionPage, TransactionQuery, WalletBalance,
};
use crate::error::AppResult;
use crate::models::CashEntry;
use crate::routes::{submission::Submission, ApiResponse};
use crate::state::AppState;
use crate::uploads::{self, UploadKind};

#[derive(Debug, Serialize)]
pub struct CreatedCashEntryResponse {
    pub id: i64,
    pub receipt_path: Option<String>,
}

pub async fn create_entry(
    State(state): State<AppState>,
    actor: Actor,
    submission: Submission<CashEntryRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedCashEntryResponse>>)> {
    let request = submission.payload;
    request.validate()?;

    let receipt_path = match submission.upload {
        Some(upload) => {
            let validated = uploads::validate(upload, state.upload_limit())?;
            Some(uploads::store(state.storage.as_ref(), UploadKind::CashReceipt, validated).await?)
        }
        None => None,
    };

    let mut conn = state.db()?;
    let entry = cashbook::record_cash_entry(&mut conn, &request, receipt_path, actor.user_id)?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(
            "cash entry saved",
            CreatedCashEntryResponse {
                id: entry.id,
                receipt_path: entry.receipt_path,
            },
        ),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

pub async fn cancel_entry(
    State(state): State<AppState>,
    Path(cash_id): Path<i64>,
    Json(request): Json<CancelRequest>,
) -> AppResult<Json<ApiResponse<CashEntry>>> {
    let mut conn = state.db()?;
    let entry = cashbook::cancel_entry(&mut conn, cash_id, &request.reason)?;
    Ok(ApiResponse::ok("cash entry cancelled", entry))
}

pub async fn wallet_balance(
    State(state): State<AppState>,
    Path(employee_id): Path<i64>,
) -> AppResult<Json<ApiResponse<WalletBalance>>> {
    let mut conn = state.db()?;
    let balance = cashbook::wallet_balance(&mut conn, employee_id);
    Ok(ApiResponse::ok("wallet balance", balance))
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionParams {
    pub days: Option<i64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

pub async fn wallet_transactions(
    State(state): State<AppState>,
    Path(employee_id): Path<i64>,
    Query(params): Query<TransactionParams>,
) -> AppResult<Json<ApiResponse<TransactionPage>>> {
    let query = TransactionQuery::new(params.days, params.page, params.page_size)?;
    let mut conn = state.db()?;
    let page = cashbook::employee_transactions(&mut conn, employee_id, query)?;
    Ok(ApiResponse::ok(
        format!("{} of {} transactions", page.entries.len(), page.total),
        page,
    ))
}

pub async fn wallet_transactions_window(
    State(state): State<AppState>,
    Path((employee_id, days)): Path<(i64, i64)>,
    Query(params): Query<TransactionParams>,
) -> AppResult<Json<ApiResponse<TransactionPage>>> {
    let query = TransactionQuery::fixed_window(days, params.page, params.page_size)?;
    let mut conn = state.db()?;
    let page = cashbook::employee_transactions(&mut conn, employee_id, query)?;
    Ok(ApiResponse::ok(
        format!("{} of {} transactions", page.entries.len(), page.total),
        page,
    ))
}
