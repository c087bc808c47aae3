//! Dispatch receipts: the billable claim a vendor raises against a dispatch.
//!
//! `amount_payable` on a stored receipt is the running balance still owed.
//! Payments shrink it under a row lock (see [`crate::settlement`]); updates
//! re-derive it as the new payable total minus everything already logged.

use chrono::Utc;
use diesel::dsl::sum;
use diesel::prelude::*;
use diesel::PgConnection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dispatches;
use crate::models::{DispatchReceipt, NewDispatchReceipt, ReceiptFields};
use crate::reference;
use crate::schema::{dispatch_receipts, dispatch_receipts_log, dispatches as dispatch_table};
use crate::status::{ReceiptStatus, RecordStatus};
use crate::uploads::UploadError;

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("dispatch receipt {0} not found")]
    NotFound(i64),
    #[error("dispatch {0} does not exist")]
    DispatchNotFound(i64),
    #[error("vendor {0} does not exist")]
    VendorNotFound(i64),
    #[error("vendor {0} is not active")]
    VendorInactive(i64),
    #[error("vehicle {0} does not exist")]
    VehicleNotFound(i64),
    #[error("{0}")]
    Validation(String),
    #[error("cannot move receipt from {from} to {to}")]
    InvalidTransition {
        from: ReceiptStatus,
        to: ReceiptStatus,
    },
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptRequest {
    pub dispatch_id: i64,
    pub vendor_id: i64,
    pub vehicle_id: Option<i64>,
    pub slip_no: Option<String>,
    #[serde(default)]
    pub gross_weight: Decimal,
    #[serde(default)]
    pub tare_weight: Decimal,
    #[serde(default)]
    pub net_weight: Decimal,
    pub material_type: Option<String>,
    pub material_rate: Option<Decimal>,
    #[serde(default)]
    pub amount_gross: Decimal,
    #[serde(default)]
    pub penalty_amount: Decimal,
    #[serde(default)]
    pub other_deduction: Decimal,
    #[serde(default)]
    pub advances_applied: Decimal,
    pub amount_payable: Option<Decimal>,
    pub remarks: Option<String>,
    pub status: Option<ReceiptStatus>,
}

impl ReceiptRequest {
    fn to_fields(&self) -> ReceiptFields {
        ReceiptFields {
            dispatch_id: self.dispatch_id,
            vendor_id: self.vendor_id,
            vehicle_id: self.vehicle_id,
            slip_no: self.slip_no.clone(),
            gross_weight: self.gross_weight,
            tare_weight: self.tare_weight,
            net_weight: self.net_weight,
            material_type: self.material_type.clone(),
            material_rate: self.material_rate,
            amount_gross: self.amount_gross,
            penalty_amount: self.penalty_amount,
            other_deduction: self.other_deduction,
            advances_applied: self.advances_applied,
            remarks: self.remarks.clone(),
        }
    }

    /// Payable total for this request.
    ///
    /// Without an explicit `amount_payable` the total is
    /// `amount_gross - penalty_amount - other_deduction - advances_applied`.
    /// An explicit value is accepted when it lies in `0..=amount_gross`, even if
    /// it disagrees with the derived figure.
    pub fn payable_total(&self) -> Result<Decimal, ReceiptError> {
        let amounts = [
            ("gross_weight", self.gross_weight),
            ("tare_weight", self.tare_weight),
            ("net_weight", self.net_weight),
            ("amount_gross", self.amount_gross),
            ("penalty_amount", self.penalty_amount),
            ("other_deduction", self.other_deduction),
            ("advances_applied", self.advances_applied),
        ];
        if let Some((field, _)) = amounts.into_iter().find(|(_, value)| *value < Decimal::ZERO) {
            return Err(ReceiptError::Validation(format!("{field} must not be negative")));
        }

        let derived = self.derived_payable();

        match self.amount_payable {
            None if derived < Decimal::ZERO => Err(ReceiptError::Validation(format!(
                "deductions exceed amount_gross by {}",
                -derived
            ))),
            None => Ok(derived),
            Some(explicit) if explicit < Decimal::ZERO => Err(ReceiptError::Validation(
                "amount_payable must not be negative".into(),
            )),
            Some(explicit) if explicit > self.amount_gross => {
                Err(ReceiptError::Validation(format!(
                    "amount_payable {explicit} exceeds amount_gross {}",
                    self.amount_gross
                )))
            }
            Some(explicit) => Ok(explicit),
        }
    }

    pub fn derived_payable(&self) -> Decimal {
        self.amount_gross - self.penalty_amount - self.other_deduction - self.advances_applied
    }

    fn warn_on_payable_mismatch(&self) {
        if let Some(explicit) = self.amount_payable {
            let derived = self.derived_payable();
            if explicit != derived {
                warn!(
                    dispatch_id = self.dispatch_id,
                    vendor_id = self.vendor_id,
                    explicit = %explicit,
                    derived = %derived,
                    "explicit amount_payable differs from derived amount"
                );
            }
        }
    }
}

/// Dispatch, vendor and vehicle referenced by the request must exist, and the
/// vendor must be active.
pub fn check_references(
    conn: &mut PgConnection,
    request: &ReceiptRequest,
) -> Result<(), ReceiptError> {
    let dispatch_exists: bool = diesel::select(diesel::dsl::exists(
        dispatch_table::table.filter(dispatch_table::id.eq(request.dispatch_id)),
    ))
    .get_result(conn)?;
    if !dispatch_exists {
        return Err(ReceiptError::DispatchNotFound(request.dispatch_id));
    }

    let vendor = reference::find_vendor(conn, request.vendor_id)?
        .ok_or(ReceiptError::VendorNotFound(request.vendor_id))?;
    if vendor.status != RecordStatus::Active {
        return Err(ReceiptError::VendorInactive(vendor.id));
    }

    if let Some(vehicle_id) = request.vehicle_id {
        if !reference::vehicle_exists(conn, vehicle_id)? {
            return Err(ReceiptError::VehicleNotFound(vehicle_id));
        }
    }

    Ok(())
}

/// Inserts the receipt and flips its dispatch to `Received` in one transaction.
pub fn create_receipt(
    conn: &mut PgConnection,
    request: &ReceiptRequest,
    slip_image_path: Option<String>,
    actor: Uuid,
) -> Result<DispatchReceipt, ReceiptError> {
    let payable = request.payable_total()?;
    request.warn_on_payable_mismatch();
    let status = request.status.unwrap_or(ReceiptStatus::Received);
    if status == ReceiptStatus::Completed && !payable.is_zero() {
        return Err(ReceiptError::Validation(
            "a receipt with an outstanding balance cannot be created as Completed".into(),
        ));
    }

    let receipt = conn.transaction::<_, ReceiptError, _>(|conn| {
        check_references(conn, request)?;

        let new_receipt = NewDispatchReceipt {
            fields: request.to_fields(),
            slip_image_path,
            amount_payable: payable,
            status,
            posted_at: (status == ReceiptStatus::Posted).then(|| Utc::now().naive_utc()),
            created_by: actor,
        };
        let receipt: DispatchReceipt = diesel::insert_into(dispatch_receipts::table)
            .values(&new_receipt)
            .get_result(conn)?;

        dispatches::mark_received(conn, receipt.dispatch_id)?;
        Ok(receipt)
    })?;

    info!(
        receipt_id = receipt.id,
        dispatch_id = receipt.dispatch_id,
        amount_payable = %receipt.amount_payable,
        "dispatch receipt created"
    );
    Ok(receipt)
}

/// Overwrites the receipt and recomputes its remaining balance against the
/// payment log. A new slip replaces the stored one; `None` keeps it.
pub fn update_receipt(
    conn: &mut PgConnection,
    receipt_id: i64,
    request: &ReceiptRequest,
    slip_image_path: Option<String>,
) -> Result<DispatchReceipt, ReceiptError> {
    let receipt = conn.transaction::<_, ReceiptError, _>(|conn| {
        let existing: DispatchReceipt = dispatch_receipts::table
            .find(receipt_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or(ReceiptError::NotFound(receipt_id))?;

        check_references(conn, request)?;
        let total = request.payable_total()?;
        request.warn_on_payable_mismatch();
        let paid = total_paid(conn, receipt_id)?;
        let remaining = total - paid;
        if remaining < Decimal::ZERO {
            return Err(ReceiptError::Validation(format!(
                "{paid} has already been paid against receipt {receipt_id}; the payable total cannot drop to {total}"
            )));
        }

        let next = request.status.unwrap_or(existing.status);
        if !existing.status.can_transition_to(next) {
            return Err(ReceiptError::InvalidTransition {
                from: existing.status,
                to: next,
            });
        }
        if next == ReceiptStatus::Completed && !remaining.is_zero() {
            return Err(ReceiptError::Validation(format!(
                "receipt {receipt_id} still has {remaining} outstanding and cannot be completed"
            )));
        }

        // Stamped once; later trips back into Posted keep the first stamp.
        let posted_at = match existing.posted_at {
            None if next == ReceiptStatus::Posted => Some(Utc::now().naive_utc()),
            stamped => stamped,
        };
        let slip = slip_image_path.or(existing.slip_image_path);
        let dispatch_changed = existing.dispatch_id != request.dispatch_id;

        let updated: DispatchReceipt = diesel::update(dispatch_receipts::table.find(receipt_id))
            .set((
                &request.to_fields(),
                dispatch_receipts::slip_image_path.eq(slip),
                dispatch_receipts::amount_payable.eq(remaining),
                dispatch_receipts::status.eq(next),
                dispatch_receipts::posted_at.eq(posted_at),
            ))
            .get_result(conn)?;

        if dispatch_changed {
            dispatches::mark_received(conn, updated.dispatch_id)?;
        }
        Ok(updated)
    })?;

    info!(
        receipt_id,
        status = %receipt.status,
        amount_payable = %receipt.amount_payable,
        "dispatch receipt updated"
    );
    Ok(receipt)
}

pub fn total_paid(conn: &mut PgConnection, receipt_id: i64) -> QueryResult<Decimal> {
    let paid: Option<Decimal> = dispatch_receipts_log::table
        .filter(dispatch_receipts_log::receipt_id.eq(receipt_id))
        .select(sum(dispatch_receipts_log::amount))
        .first(conn)?;
    Ok(paid.unwrap_or_default())
}

#[derive(Debug, Serialize)]
pub struct ReceiptView {
    #[serde(flatten)]
    pub receipt: DispatchReceipt,
    pub total_paid: Decimal,
    pub original_payable: Decimal,
}

pub fn get_receipt(conn: &mut PgConnection, receipt_id: i64) -> Result<ReceiptView, ReceiptError> {
    let receipt: DispatchReceipt = dispatch_receipts::table
        .find(receipt_id)
        .first(conn)
        .optional()?
        .ok_or(ReceiptError::NotFound(receipt_id))?;
    let total_paid = total_paid(conn, receipt_id)?;

    Ok(ReceiptView {
        original_payable: receipt.amount_payable + total_paid,
        total_paid,
        receipt,
    })
}
