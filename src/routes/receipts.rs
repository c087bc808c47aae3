use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::Serialize;
use tracing::error;

use crate::auth::Actor;
use crate::error::{AppError, AppResult};
use crate::models::{DispatchReceipt, DispatchReceiptLog};
use crate::receipts::{self, ReceiptRequest, ReceiptView};
use crate::routes::{submission::Submission, ApiResponse};
use crate::schema::dispatch_receipts;
use crate::settlement::{self, PaymentOutcome, PaymentRequest};
use crate::state::AppState;
use crate::uploads::{self, UploadKind};

const SLIP_URL_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Serialize)]
pub struct CreatedReceiptResponse {
    pub id: i64,
    pub amount_payable: rust_decimal::Decimal,
    pub slip_image_path: Option<String>,
}

/// Validates the file, then the references, and only then writes anything.
async fn store_slip(
    state: &AppState,
    request: &ReceiptRequest,
    upload: Option<uploads::Upload>,
) -> AppResult<Option<String>> {
    let validated = upload
        .map(|upload| uploads::validate(upload, state.upload_limit()))
        .transpose()?;

    {
        let mut conn = state.db()?;
        receipts::check_references(&mut conn, request)?;
    }

    match validated {
        Some(file) => Ok(Some(
            uploads::store(state.storage.as_ref(), UploadKind::DispatchSlip, file).await?,
        )),
        None => Ok(None),
    }
}

pub async fn create_receipt(
    State(state): State<AppState>,
    actor: Actor,
    submission: Submission<ReceiptRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CreatedReceiptResponse>>)> {
    let request = submission.payload;
    request.payable_total()?;
    let slip = store_slip(&state, &request, submission.upload).await?;

    let mut conn = state.db()?;
    let receipt = receipts::create_receipt(&mut conn, &request, slip.clone(), actor.user_id)
        .map_err(|err| {
            if let Some(key) = slip.as_deref() {
                error!(error = %err, slip = key, "receipt not saved; slip left in storage");
            }
            err
        })?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(
            "dispatch receipt created",
            CreatedReceiptResponse {
                id: receipt.id,
                amount_payable: receipt.amount_payable,
                slip_image_path: receipt.slip_image_path,
            },
        ),
    ))
}

pub async fn get_receipt(
    State(state): State<AppState>,
    Path(receipt_id): Path<i64>,
) -> AppResult<Json<ApiResponse<ReceiptView>>> {
    let mut conn = state.db()?;
    let view = receipts::get_receipt(&mut conn, receipt_id)?;
    Ok(ApiResponse::ok("dispatch receipt found", view))
}

pub async fn update_receipt(
    State(state): State<AppState>,
    Path(receipt_id): Path<i64>,
    submission: Submission<ReceiptRequest>,
) -> AppResult<Json<ApiResponse<DispatchReceipt>>> {
    let request = submission.payload;
    {
        let mut conn = state.db()?;
        let exists: bool = diesel::select(diesel::dsl::exists(
            dispatch_receipts::table.filter(dispatch_receipts::id.eq(receipt_id)),
        ))
        .get_result(&mut conn)?;
        if !exists {
            return Err(receipts::ReceiptError::NotFound(receipt_id).into());
        }
    }
    request.payable_total()?;
    let slip = store_slip(&state, &request, submission.upload).await?;

    let mut conn = state.db()?;
    let receipt = receipts::update_receipt(&mut conn, receipt_id, &request, slip)?;
    Ok(ApiResponse::ok("dispatch receipt updated", receipt))
}

pub async fn process_payment(
    State(state): State<AppState>,
    actor: Actor,
    Path(receipt_id): Path<i64>,
    Json(request): Json<PaymentRequest>,
) -> AppResult<Json<ApiResponse<PaymentOutcome>>> {
    let mut conn = state.db()?;
    let outcome = settlement::process_payment(
        &mut conn,
        receipt_id,
        &request,
        state.settlement_codes(),
        actor.user_id,
    )?;
    Ok(ApiResponse::ok(outcome.message.clone(), outcome))
}

pub async fn payment_history(
    State(state): State<AppState>,
    Path(receipt_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<DispatchReceiptLog>>>> {
    let mut conn = state.db()?;
    let rows = settlement::payment_history(&mut conn, receipt_id)?;
    Ok(ApiResponse::ok(format!("{} payments", rows.len()), rows))
}

#[derive(Debug, Serialize)]
pub struct SlipUrlResponse {
    pub url: String,
    pub expires_in_seconds: u64,
}

pub async fn slip_url(
    State(state): State<AppState>,
    Path(receipt_id): Path<i64>,
) -> AppResult<Json<ApiResponse<SlipUrlResponse>>> {
    let key = {
        let mut conn = state.db()?;
        let view = receipts::get_receipt(&mut conn, receipt_id)?;
        view.receipt
            .slip_image_path
            .ok_or_else(|| AppError::not_found_with("receipt has no slip image"))?
    };

    let url = state
        .storage
        .presign_get_object(&key, SLIP_URL_TTL)
        .await
        .map_err(AppError::internal)?;

    Ok(ApiResponse::ok(
        "slip url issued",
        SlipUrlResponse {
            url,
            expires_in_seconds: SLIP_URL_TTL.as_secs(),
        },
    ))
}
