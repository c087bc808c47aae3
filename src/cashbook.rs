//! Cash movements and employee wallets.
//!
//! The cashbook is shared by settlement payments and ad-hoc cash entries; each
//! caller writes through its own function ([`record_settlement_payment`],
//! [`record_cash_entry`]). Rows are never deleted. Cancellation flips the
//! status and cancelled rows drop out of balances and history.

use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Numeric, Text};
use diesel::PgConnection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::SettlementCodes;
use crate::models::{CashEntry, NewCashEntry};
use crate::schema::{cash_kinds, cashbook};
use crate::status::CashStatus;
use crate::uploads::UploadError;
use crate::CURRENCY;

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const MAX_WINDOW_DAYS: i64 = 366;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const FIXED_WINDOWS: [i64; 3] = [7, 14, 30];

#[derive(Debug, Error)]
pub enum CashbookError {
    #[error("cash entry {0} not found")]
    NotFound(i64),
    #[error("cash entry {0} is already cancelled")]
    AlreadyCancelled(i64),
    #[error("{0}")]
    Validation(String),
    #[error("unsupported window of {0} days; use 7, 14 or 30")]
    UnsupportedWindow(i64),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CashEntryRequest {
    pub happened_at: Option<NaiveDateTime>,
    pub cash_kind_id: i64,
    pub amount: Decimal,
    pub money_account_id: Option<i64>,
    pub wallet_employee_id: Option<i64>,
    pub category_id: i64,
    pub cost_center_id: i64,
    pub cost_center_sub_id: Option<i64>,
    pub payment_mode_id: i64,
    pub reference_no: Option<String>,
    pub counterparty: Option<String>,
    pub remarks: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    pub dispatch_id: Option<i64>,
}

impl CashEntryRequest {
    pub fn validate(&self) -> Result<(), CashbookError> {
        if self.amount <= Decimal::ZERO {
            return Err(CashbookError::Validation(
                "amount must be greater than zero".into(),
            ));
        }
        if !(self.metadata.is_null() || self.metadata.is_object()) {
            return Err(CashbookError::Validation(
                "metadata must be a JSON object".into(),
            ));
        }
        Ok(())
    }
}

fn metadata_or_empty(metadata: &Value) -> Value {
    if metadata.is_null() {
        Value::Object(Default::default())
    } else {
        metadata.clone()
    }
}

/// Records an ad-hoc cash movement. `receipt_path` is the storage key of an
/// image uploaded with the entry.
pub fn record_cash_entry(
    conn: &mut PgConnection,
    request: &CashEntryRequest,
    receipt_path: Option<String>,
    actor: Uuid,
) -> Result<CashEntry, CashbookError> {
    request.validate()?;

    let kind_exists: bool = diesel::select(diesel::dsl::exists(
        cash_kinds::table.filter(cash_kinds::id.eq(request.cash_kind_id)),
    ))
    .get_result(conn)?;
    if !kind_exists {
        return Err(CashbookError::Validation(format!(
            "cash kind {} does not exist",
            request.cash_kind_id
        )));
    }

    let entry = NewCashEntry {
        happened_at: request.happened_at.unwrap_or_else(|| Utc::now().naive_utc()),
        cash_kind_id: request.cash_kind_id,
        amount: request.amount,
        currency: CURRENCY.to_string(),
        money_account_id: request.money_account_id,
        wallet_employee_id: request.wallet_employee_id,
        category_id: request.category_id,
        cost_center_id: request.cost_center_id,
        cost_center_sub_id: request.cost_center_sub_id,
        payment_mode_id: request.payment_mode_id,
        reference_no: request.reference_no.clone(),
        counterparty: request.counterparty.clone(),
        remarks: request.remarks.clone(),
        metadata: metadata_or_empty(&request.metadata),
        status: CashStatus::Active,
        receipt_path: receipt_path.clone(),
        dispatch_id: request.dispatch_id,
        created_by: actor,
    };

    let saved: CashEntry = diesel::insert_into(cashbook::table)
        .values(&entry)
        .get_result(conn)
        .map_err(|err| {
            error!(
                error = %err,
                receipt_path = receipt_path.as_deref().unwrap_or("-"),
                "failed to save cash entry"
            );
            err
        })?;

    info!(cash_id = saved.id, amount = %saved.amount, "cash entry saved");
    Ok(saved)
}

/// Cashbook side of a dispatch receipt payment.
#[derive(Debug, Clone)]
pub struct SettlementCash {
    pub receipt_id: i64,
    pub dispatch_id: i64,
    pub counterparty: String,
    pub amount: Decimal,
    pub money_account_id: Option<i64>,
    pub happened_at: NaiveDateTime,
    pub remarks: Option<String>,
    pub metadata: Value,
    pub codes: SettlementCodes,
    pub created_by: Uuid,
}

pub fn record_settlement_payment(
    conn: &mut PgConnection,
    payment: SettlementCash,
) -> QueryResult<CashEntry> {
    let entry = NewCashEntry {
        happened_at: payment.happened_at,
        cash_kind_id: payment.codes.cash_kind_id,
        amount: payment.amount,
        currency: CURRENCY.to_string(),
        money_account_id: payment.money_account_id,
        wallet_employee_id: None,
        category_id: payment.codes.category_id,
        cost_center_id: payment.codes.cost_center_id,
        cost_center_sub_id: None,
        payment_mode_id: payment.codes.payment_mode_id,
        reference_no: Some(payment.receipt_id.to_string()),
        counterparty: Some(payment.counterparty),
        remarks: payment.remarks,
        metadata: payment.metadata,
        status: CashStatus::Active,
        receipt_path: None,
        dispatch_id: Some(payment.dispatch_id),
        created_by: payment.created_by,
    };

    diesel::insert_into(cashbook::table)
        .values(&entry)
        .get_result(conn)
}

fn cancelled_remarks(existing: Option<&str>, reason: &str) -> String {
    match existing.map(str::trim).filter(|r| !r.is_empty()) {
        Some(remarks) => format!("{remarks} [Cancelled: {reason}]"),
        None => format!("[Cancelled: {reason}]"),
    }
}

pub fn cancel_entry(
    conn: &mut PgConnection,
    cash_id: i64,
    reason: &str,
) -> Result<CashEntry, CashbookError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(CashbookError::Validation(
            "a cancellation reason is required".into(),
        ));
    }

    let cancelled = conn.transaction::<_, CashbookError, _>(|conn| {
        let entry: CashEntry = cashbook::table
            .find(cash_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or(CashbookError::NotFound(cash_id))?;
        if entry.status == CashStatus::Cancelled {
            return Err(CashbookError::AlreadyCancelled(cash_id));
        }

        let remarks = cancelled_remarks(entry.remarks.as_deref(), reason);
        let updated = diesel::update(cashbook::table.find(cash_id))
            .set((
                cashbook::status.eq(CashStatus::Cancelled),
                cashbook::remarks.eq(Some(remarks)),
            ))
            .get_result(conn)?;
        Ok(updated)
    })?;

    info!(cash_id, reason, "cash entry cancelled");
    Ok(cancelled)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletBalance {
    pub employee_id: i64,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub balance: Decimal,
    pub currency: String,
}

impl WalletBalance {
    fn empty(employee_id: i64) -> Self {
        Self {
            employee_id,
            total_in: Decimal::ZERO,
            total_out: Decimal::ZERO,
            balance: Decimal::ZERO,
            currency: CURRENCY.to_string(),
        }
    }
}

#[derive(QueryableByName)]
struct WalletRow {
    #[diesel(sql_type = Numeric)]
    total_in: Decimal,
    #[diesel(sql_type = Numeric)]
    total_out: Decimal,
    #[diesel(sql_type = Numeric)]
    balance: Decimal,
    #[diesel(sql_type = Text)]
    currency: String,
}

/// Employee wallet position from the `wallet_balance` SQL function. Degrades to
/// a zero balance when the function call fails.
pub fn wallet_balance(conn: &mut PgConnection, employee_id: i64) -> WalletBalance {
    let row = diesel::sql_query(
        "SELECT total_in, total_out, balance, currency FROM wallet_balance($1)",
    )
    .bind::<BigInt, _>(employee_id)
    .get_result::<WalletRow>(conn);

    match row {
        Ok(row) => WalletBalance {
            employee_id,
            total_in: row.total_in,
            total_out: row.total_out,
            balance: row.balance,
            currency: row.currency,
        },
        Err(err) => {
            warn!(employee_id, error = %err, "wallet balance lookup failed; reporting zero");
            WalletBalance::empty(employee_id)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionQuery {
    pub days: i64,
    pub page: i64,
    pub page_size: i64,
}

impl TransactionQuery {
    pub fn new(
        days: Option<i64>,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<Self, CashbookError> {
        let query = Self {
            days: days.unwrap_or(DEFAULT_WINDOW_DAYS),
            page: page.unwrap_or(1),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        };
        if !(1..=MAX_WINDOW_DAYS).contains(&query.days) {
            return Err(CashbookError::Validation(format!(
                "days must be between 1 and {MAX_WINDOW_DAYS}"
            )));
        }
        if query.page < 1 {
            return Err(CashbookError::Validation("page must be at least 1".into()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&query.page_size) {
            return Err(CashbookError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(query)
    }

    /// One of the fixed 7, 14 or 30 day windows.
    pub fn fixed_window(
        days: i64,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<Self, CashbookError> {
        if !FIXED_WINDOWS.contains(&days) {
            return Err(CashbookError::UnsupportedWindow(days));
        }
        Self::new(Some(days), page, page_size)
    }

    fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionPage {
    pub employee_id: i64,
    pub days: i64,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
    pub entries: Vec<CashEntry>,
}

fn total_pages(total: i64, page_size: i64) -> i64 {
    (total + page_size - 1) / page_size
}

/// Active wallet entries from the last `query.days` days, newest first.
pub fn employee_transactions(
    conn: &mut PgConnection,
    employee_id: i64,
    query: TransactionQuery,
) -> Result<TransactionPage, CashbookError> {
    let since = Utc::now().naive_utc() - Duration::days(query.days);

    let total: i64 = cashbook::table
        .filter(cashbook::wallet_employee_id.eq(employee_id))
        .filter(cashbook::status.eq(CashStatus::Active))
        .filter(cashbook::happened_at.ge(since))
        .count()
        .get_result(conn)?;

    let entries = cashbook::table
        .filter(cashbook::wallet_employee_id.eq(employee_id))
        .filter(cashbook::status.eq(CashStatus::Active))
        .filter(cashbook::happened_at.ge(since))
        .order((cashbook::happened_at.desc(), cashbook::id.desc()))
        .limit(query.page_size)
        .offset(query.offset())
        .load(conn)?;

    Ok(TransactionPage {
        employee_id,
        days: query.days,
        page: query.page,
        page_size: query.page_size,
        total,
        total_pages: total_pages(total, query.page_size),
        entries,
    })
}
