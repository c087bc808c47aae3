//! Payments against dispatch receipts.
//!
//! A payment locks the receipt row, validates the amount against the balance
//! it sees under the lock, then writes the receipt update, a cashbook row, an
//! AP ledger `Payment` row and a log row in one transaction. Concurrent payers
//! on the same receipt queue on the lock and validate against the committed
//! balance.

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::ap_ledger::{self, PaymentPosting};
use crate::cashbook::{self, SettlementCash};
use crate::config::SettlementCodes;
use crate::models::{Dispatch, DispatchReceipt, DispatchReceiptLog, NewDispatchReceiptLog};
use crate::reference;
use crate::schema::{dispatch_receipts, dispatch_receipts_log, dispatches};
use crate::status::ReceiptStatus;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("dispatch receipt {0} not found")]
    ReceiptNotFound(i64),
    #[error("dispatch receipt {0} has no payable amount")]
    NoPayableAmount(i64),
    #[error("payment amount must be greater than zero")]
    InvalidAmount,
    #[error("payment amount {requested} exceeds payable amount {payable}")]
    AmountExceedsPayable { requested: Decimal, payable: Decimal },
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub remarks: Option<String>,
    pub money_account_id: Option<i64>,
    pub happened_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentPlan {
    pub amount: Decimal,
    pub remaining: Decimal,
    pub status: ReceiptStatus,
}

/// Checks a payment of `amount` against a receipt whose balance is `payable`.
pub fn plan_payment(
    receipt_id: i64,
    payable: Decimal,
    amount: Decimal,
) -> Result<PaymentPlan, SettlementError> {
    if payable <= Decimal::ZERO {
        return Err(SettlementError::NoPayableAmount(receipt_id));
    }
    if amount <= Decimal::ZERO {
        return Err(SettlementError::InvalidAmount);
    }
    if amount > payable {
        return Err(SettlementError::AmountExceedsPayable {
            requested: amount,
            payable,
        });
    }

    let remaining = payable - amount;
    Ok(PaymentPlan {
        amount,
        remaining,
        status: ReceiptStatus::after_payment(remaining.is_zero()),
    })
}

#[derive(Debug, Serialize)]
pub struct PaymentOutcome {
    pub success: bool,
    pub receipt_id: i64,
    pub amount_paid: Decimal,
    pub remaining_balance: Decimal,
    pub status: ReceiptStatus,
    pub cash_id: i64,
    pub ap_ledger_id: i64,
    pub log_id: i64,
    pub message: String,
}

pub fn process_payment(
    conn: &mut PgConnection,
    receipt_id: i64,
    request: &PaymentRequest,
    codes: SettlementCodes,
    actor: Uuid,
) -> Result<PaymentOutcome, SettlementError> {
    let outcome = conn.transaction::<_, SettlementError, _>(|conn| {
        let receipt: DispatchReceipt = dispatch_receipts::table
            .find(receipt_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or(SettlementError::ReceiptNotFound(receipt_id))?;
        let dispatch: Dispatch = dispatches::table.find(receipt.dispatch_id).first(conn)?;
        let vendor = reference::find_vendor(conn, receipt.vendor_id)?
            .ok_or(diesel::result::Error::NotFound)?;

        let plan = plan_payment(receipt.id, receipt.amount_payable, request.amount)?;
        let now = Utc::now().naive_utc();

        diesel::update(dispatch_receipts::table.find(receipt.id))
            .set((
                dispatch_receipts::amount_payable.eq(plan.remaining),
                dispatch_receipts::status.eq(plan.status),
                dispatch_receipts::posted_at.eq(Some(now)),
            ))
            .execute(conn)?;

        let remarks = request
            .remarks
            .clone()
            .unwrap_or_else(|| format!("Payment for dispatch slip {}", dispatch.slip_no));
        let cash = cashbook::record_settlement_payment(
            conn,
            SettlementCash {
                receipt_id: receipt.id,
                dispatch_id: dispatch.id,
                counterparty: vendor.name.clone(),
                amount: plan.amount,
                money_account_id: request.money_account_id,
                happened_at: request.happened_at.unwrap_or(now),
                remarks: Some(remarks.clone()),
                metadata: json!({
                    "source": "dispatch_receipt_payment",
                    "receipt_id": receipt.id,
                    "dispatch_id": dispatch.id,
                    "vendor_id": vendor.id,
                    "extra": request.metadata,
                }),
                codes,
                created_by: actor,
            },
        )?;

        let ledger = ap_ledger::post_payment(
            conn,
            PaymentPosting {
                vendor_id: vendor.id,
                amount: plan.amount,
                dispatch_id: dispatch.id,
                cash_id: cash.id,
                reference_no: Some(receipt.id.to_string()),
                remarks: Some(remarks),
                created_by: actor,
            },
        )?;

        let log: DispatchReceiptLog = diesel::insert_into(dispatch_receipts_log::table)
            .values(&NewDispatchReceiptLog {
                receipt_id: receipt.id,
                amount: plan.amount,
                created_by: actor,
            })
            .get_result(conn)?;

        Ok(PaymentOutcome {
            success: true,
            receipt_id: receipt.id,
            amount_paid: plan.amount,
            remaining_balance: plan.remaining,
            status: plan.status,
            cash_id: cash.id,
            ap_ledger_id: ledger.id,
            log_id: log.id,
            message: if plan.remaining.is_zero() {
                "payment recorded; receipt fully settled".to_string()
            } else {
                format!("payment recorded; {} remaining", plan.remaining)
            },
        })
    })?;

    info!(
        receipt_id,
        amount = %outcome.amount_paid,
        remaining = %outcome.remaining_balance,
        status = %outcome.status,
        cash_id = outcome.cash_id,
        "dispatch receipt payment processed"
    );
    Ok(outcome)
}

/// Payment log rows for a receipt, newest first.
pub fn payment_history(
    conn: &mut PgConnection,
    receipt_id: i64,
) -> Result<Vec<DispatchReceiptLog>, SettlementError> {
    let receipt: DispatchReceipt = dispatch_receipts::table
        .find(receipt_id)
        .first(conn)
        .optional()?
        .ok_or(SettlementError::ReceiptNotFound(receipt_id))?;

    let rows = DispatchReceiptLog::belonging_to(&receipt)
        .order((
            dispatch_receipts_log::created_at.desc(),
            dispatch_receipts_log::id.desc(),
        ))
        .load(conn)?;
    Ok(rows)
}
