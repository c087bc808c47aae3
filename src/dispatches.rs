//! Dispatch records and the three AP bills posted with each one.

use diesel::prelude::*;
use diesel::PgConnection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::ap_ledger::{self, BillPosting};
use crate::models::{ApLedgerEntry, Dispatch, DispatchFields, NewDispatch};
use crate::reference;
use crate::schema::{dispatch_receipts, dispatches};
use crate::status::{ChargeType, DispatchStatus};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatch {0} not found")]
    NotFound(i64),
    #[error("no active transporter vendor is configured")]
    NoTransporterVendor,
    #[error("dispatch {dispatch_id} has {receipts} receipt(s) and cannot be deleted")]
    HasReceipts { dispatch_id: i64, receipts: i64 },
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchRequest {
    pub vehicle_id: i64,
    pub delivery_location_id: i64,
    pub material_type: Option<String>,
    pub material_rate: Option<Decimal>,
    pub slip_no: String,
    pub slip_image_path: Option<String>,
    #[serde(default)]
    pub gross_weight: Decimal,
    #[serde(default)]
    pub tare_weight: Decimal,
    #[serde(default)]
    pub net_weight: Decimal,
    pub loader_charges: Option<Decimal>,
    #[serde(default)]
    pub loader_auto: bool,
    #[serde(default)]
    pub loader_charge_type: ChargeType,
    pub labor_charges: Option<Decimal>,
    #[serde(default)]
    pub labor_auto: bool,
    #[serde(default)]
    pub labor_charge_type: ChargeType,
    pub transporter_rate: Option<Decimal>,
    #[serde(default)]
    pub transporter_auto: bool,
    #[serde(default)]
    pub transporter_charge_type: ChargeType,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub total_deduction: Decimal,
    #[serde(default)]
    pub payable_weight: Decimal,
    /// Honoured on create only.
    pub status: Option<DispatchStatus>,
    pub bucket_vendor_id: i64,
    pub labour_vendor_id: i64,
}

impl DispatchRequest {
    fn validate(&self) -> Result<(), DispatchError> {
        if self.slip_no.trim().is_empty() {
            return Err(DispatchError::Validation("slip_no is required".into()));
        }

        let amounts = [
            ("gross_weight", Some(self.gross_weight)),
            ("tare_weight", Some(self.tare_weight)),
            ("net_weight", Some(self.net_weight)),
            ("material_rate", self.material_rate),
            ("loader_charges", self.loader_charges),
            ("labor_charges", self.labor_charges),
            ("transporter_rate", self.transporter_rate),
            ("total_amount", Some(self.total_amount)),
            ("total_deduction", Some(self.total_deduction)),
            ("payable_weight", Some(self.payable_weight)),
        ];
        if let Some((field, _)) = amounts
            .into_iter()
            .find(|(_, value)| value.is_some_and(|v| v < Decimal::ZERO))
        {
            return Err(DispatchError::Validation(format!(
                "{field} must not be negative"
            )));
        }

        Ok(())
    }

    fn to_fields(&self) -> DispatchFields {
        DispatchFields {
            vehicle_id: self.vehicle_id,
            delivery_location_id: self.delivery_location_id,
            material_type: self.material_type.clone(),
            material_rate: self.material_rate,
            slip_no: self.slip_no.trim().to_string(),
            slip_image_path: self.slip_image_path.clone(),
            gross_weight: self.gross_weight,
            tare_weight: self.tare_weight,
            net_weight: self.net_weight,
            loader_charges: self.loader_charges,
            loader_auto: self.loader_auto,
            loader_charge_type: self.loader_charge_type,
            labor_charges: self.labor_charges,
            labor_auto: self.labor_auto,
            labor_charge_type: self.labor_charge_type,
            transporter_rate: self.transporter_rate,
            transporter_auto: self.transporter_auto,
            transporter_charge_type: self.transporter_charge_type,
            total_amount: self.total_amount,
            total_deduction: self.total_deduction,
            payable_weight: self.payable_weight,
            bucket_vendor_id: self.bucket_vendor_id,
            labour_vendor_id: self.labour_vendor_id,
        }
    }
}

/// One bill to post for a new dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillLine {
    pub vendor_id: i64,
    pub amount: Decimal,
    pub role: &'static str,
}

/// Loader, labour and transporter bills, in that order. Missing charges bill 0.
pub fn bill_lines(fields: &DispatchFields, transporter_vendor_id: i64) -> [BillLine; 3] {
    [
        BillLine {
            vendor_id: fields.bucket_vendor_id,
            amount: fields.loader_charges.unwrap_or_default(),
            role: "loader",
        },
        BillLine {
            vendor_id: fields.labour_vendor_id,
            amount: fields.labor_charges.unwrap_or_default(),
            role: "labour",
        },
        BillLine {
            vendor_id: transporter_vendor_id,
            amount: fields.transporter_rate.unwrap_or_default(),
            role: "transporter",
        },
    ]
}

#[derive(Debug, Serialize)]
pub struct CreatedDispatch {
    pub dispatch: Dispatch,
    pub bills: Vec<ApLedgerEntry>,
}

fn ensure_references(conn: &mut PgConnection, fields: &DispatchFields) -> Result<(), DispatchError> {
    if !reference::vehicle_exists(conn, fields.vehicle_id)? {
        return Err(DispatchError::InvalidReference(format!(
            "vehicle {} does not exist",
            fields.vehicle_id
        )));
    }
    if !reference::delivery_location_exists(conn, fields.delivery_location_id)? {
        return Err(DispatchError::InvalidReference(format!(
            "delivery location {} does not exist",
            fields.delivery_location_id
        )));
    }
    for vendor_id in [fields.bucket_vendor_id, fields.labour_vendor_id] {
        if reference::find_vendor(conn, vendor_id)?.is_none() {
            return Err(DispatchError::InvalidReference(format!(
                "vendor {vendor_id} does not exist"
            )));
        }
    }
    Ok(())
}

pub fn create_dispatch(
    conn: &mut PgConnection,
    request: &DispatchRequest,
    actor: Uuid,
) -> Result<CreatedDispatch, DispatchError> {
    request.validate()?;
    let fields = request.to_fields();

    let created = conn.transaction::<_, DispatchError, _>(|conn| {
        ensure_references(conn, &fields)?;
        let transporter =
            reference::transporter_vendor(conn)?.ok_or(DispatchError::NoTransporterVendor)?;

        let new_dispatch = NewDispatch {
            fields: fields.clone(),
            status: request.status.unwrap_or_default(),
            created_by: actor,
        };
        let dispatch: Dispatch = diesel::insert_into(dispatches::table)
            .values(&new_dispatch)
            .get_result(conn)?;

        let mut bills = Vec::with_capacity(3);
        for line in bill_lines(&fields, transporter.id) {
            let bill = ap_ledger::post_bill(
                conn,
                BillPosting {
                    vendor_id: line.vendor_id,
                    amount: line.amount,
                    dispatch_id: dispatch.id,
                    reference_no: Some(dispatch.slip_no.clone()),
                    remarks: Some(format!("{} charges for dispatch {}", line.role, dispatch.id)),
                    created_by: actor,
                },
            )?;
            bills.push(bill);
        }

        Ok(CreatedDispatch { dispatch, bills })
    })?;

    info!(
        dispatch_id = created.dispatch.id,
        slip_no = %created.dispatch.slip_no,
        bills = created.bills.len(),
        "dispatch created"
    );
    Ok(created)
}

pub fn get_dispatch(conn: &mut PgConnection, dispatch_id: i64) -> Result<Dispatch, DispatchError> {
    dispatches::table
        .find(dispatch_id)
        .first(conn)
        .optional()?
        .ok_or(DispatchError::NotFound(dispatch_id))
}

/// Overwrites every editable column. Status and posted bills are left alone.
pub fn update_dispatch(
    conn: &mut PgConnection,
    dispatch_id: i64,
    request: &DispatchRequest,
) -> Result<Dispatch, DispatchError> {
    request.validate()?;
    let fields = request.to_fields();

    let dispatch = conn.transaction::<_, DispatchError, _>(|conn| {
        dispatches::table
            .find(dispatch_id)
            .for_update()
            .select(dispatches::id)
            .first::<i64>(conn)
            .optional()?
            .ok_or(DispatchError::NotFound(dispatch_id))?;

        ensure_references(conn, &fields)?;
        let updated = diesel::update(dispatches::table.find(dispatch_id))
            .set(&fields)
            .get_result::<Dispatch>(conn)?;
        Ok(updated)
    })?;

    info!(dispatch_id, "dispatch updated");
    Ok(dispatch)
}

pub fn delete_dispatch(conn: &mut PgConnection, dispatch_id: i64) -> Result<(), DispatchError> {
    conn.transaction::<_, DispatchError, _>(|conn| {
        dispatches::table
            .find(dispatch_id)
            .for_update()
            .select(dispatches::id)
            .first::<i64>(conn)
            .optional()?
            .ok_or(DispatchError::NotFound(dispatch_id))?;

        let receipts: i64 = dispatch_receipts::table
            .filter(dispatch_receipts::dispatch_id.eq(dispatch_id))
            .count()
            .get_result(conn)?;
        if receipts > 0 {
            return Err(DispatchError::HasReceipts {
                dispatch_id,
                receipts,
            });
        }

        diesel::delete(dispatches::table.find(dispatch_id)).execute(conn)?;
        Ok(())
    })?;

    info!(dispatch_id, "dispatch deleted");
    Ok(())
}

/// Dispatches with `status` at any active delivery location of the user's customers.
pub fn list_for_user(
    conn: &mut PgConnection,
    user_id: Uuid,
    status: DispatchStatus,
) -> Result<Vec<Dispatch>, DispatchError> {
    let location_ids = reference::active_location_ids_for_user(conn, user_id)?;
    if location_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = dispatches::table
        .filter(dispatches::delivery_location_id.eq_any(location_ids))
        .filter(dispatches::status.eq(status))
        .order((dispatches::created_at.desc(), dispatches::id.desc()))
        .load(conn)?;
    Ok(rows)
}

pub(crate) fn mark_received(conn: &mut PgConnection, dispatch_id: i64) -> QueryResult<usize> {
    diesel::update(dispatches::table.find(dispatch_id))
        .set(dispatches::status.eq(DispatchStatus::Received))
        .execute(conn)
}
