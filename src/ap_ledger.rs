//! Accounts-payable ledger.
//!
//! Rows are only ever inserted through [`post_bill`] and [`post_payment`].
//! Amounts are stored positive; the entry kind carries the sign, so a vendor's
//! outstanding liability is `SUM(Bill) - SUM(Payment)`.

use chrono::Utc;
use diesel::prelude::*;
use diesel::PgConnection;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ApLedgerEntry, NewApLedgerEntry};
use crate::reference;
use crate::schema::ap_ledger;
use crate::status::EntryKind;
use crate::CURRENCY;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("vendor {0} not found")]
    VendorNotFound(i64),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

#[derive(Debug, Clone)]
pub struct BillPosting {
    pub vendor_id: i64,
    pub amount: Decimal,
    pub dispatch_id: i64,
    pub reference_no: Option<String>,
    pub remarks: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone)]
pub struct PaymentPosting {
    pub vendor_id: i64,
    pub amount: Decimal,
    pub dispatch_id: i64,
    pub cash_id: i64,
    pub reference_no: Option<String>,
    pub remarks: Option<String>,
    pub created_by: Uuid,
}

pub fn post_bill(conn: &mut PgConnection, bill: BillPosting) -> QueryResult<ApLedgerEntry> {
    let entry = NewApLedgerEntry {
        vendor_id: bill.vendor_id,
        happened_at: Utc::now().naive_utc(),
        entry_kind: EntryKind::Bill,
        amount: bill.amount,
        currency: CURRENCY.to_string(),
        dispatch_id: Some(bill.dispatch_id),
        cash_id: None,
        reference_no: bill.reference_no,
        remarks: bill.remarks,
        created_by: bill.created_by,
    };

    diesel::insert_into(ap_ledger::table)
        .values(&entry)
        .get_result(conn)
}

pub fn post_payment(
    conn: &mut PgConnection,
    payment: PaymentPosting,
) -> QueryResult<ApLedgerEntry> {
    let entry = NewApLedgerEntry {
        vendor_id: payment.vendor_id,
        happened_at: Utc::now().naive_utc(),
        entry_kind: EntryKind::Payment,
        amount: payment.amount,
        currency: CURRENCY.to_string(),
        dispatch_id: Some(payment.dispatch_id),
        cash_id: Some(payment.cash_id),
        reference_no: payment.reference_no,
        remarks: payment.remarks,
        created_by: payment.created_by,
    };

    diesel::insert_into(ap_ledger::table)
        .values(&entry)
        .get_result(conn)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerTotals {
    pub billed: Decimal,
    pub paid: Decimal,
    pub outstanding: Decimal,
}

pub fn totals<'a>(entries: impl IntoIterator<Item = &'a ApLedgerEntry>) -> LedgerTotals {
    let (billed, paid) = entries.into_iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(billed, paid), entry| match entry.entry_kind {
            EntryKind::Bill => (billed + entry.amount, paid),
            EntryKind::Payment => (billed, paid + entry.amount),
        },
    );
    LedgerTotals {
        billed,
        paid,
        outstanding: billed - paid,
    }
}

#[derive(Debug, Serialize)]
pub struct VendorStatement {
    pub vendor_id: i64,
    pub vendor_name: String,
    pub currency: &'static str,
    #[serde(flatten)]
    pub totals: LedgerTotals,
    pub entries: Vec<ApLedgerEntry>,
}

pub fn vendor_statement(
    conn: &mut PgConnection,
    vendor_id: i64,
) -> Result<VendorStatement, LedgerError> {
    let vendor =
        reference::find_vendor(conn, vendor_id)?.ok_or(LedgerError::VendorNotFound(vendor_id))?;

    let entries: Vec<ApLedgerEntry> = ap_ledger::table
        .filter(ap_ledger::vendor_id.eq(vendor_id))
        .order((ap_ledger::happened_at.desc(), ap_ledger::id.desc()))
        .load(conn)?;

    Ok(VendorStatement {
        vendor_id,
        vendor_name: vendor.name,
        currency: CURRENCY,
        totals: totals(&entries),
        entries,
    })
}
