use chrono::NaiveDateTime;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::*;
use crate::status::{
    CashStatus, ChargeType, DispatchStatus, EntryKind, ReceiptStatus, RecordStatus,
};

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = vendors)]
pub struct Vendor {
    pub id: i64,
    pub name: String,
    pub status: RecordStatus,
    pub is_loader: bool,
    pub is_labour: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = dispatches)]
pub struct Dispatch {
    pub id: i64,
    pub vehicle_id: i64,
    pub delivery_location_id: i64,
    pub material_type: Option<String>,
    pub material_rate: Option<Decimal>,
    pub slip_no: String,
    pub slip_image_path: Option<String>,
    pub gross_weight: Decimal,
    pub tare_weight: Decimal,
    pub net_weight: Decimal,
    pub loader_charges: Option<Decimal>,
    pub loader_auto: bool,
    pub loader_charge_type: ChargeType,
    pub labor_charges: Option<Decimal>,
    pub labor_auto: bool,
    pub labor_charge_type: ChargeType,
    pub transporter_rate: Option<Decimal>,
    pub transporter_auto: bool,
    pub transporter_charge_type: ChargeType,
    pub total_amount: Decimal,
    pub total_deduction: Decimal,
    pub payable_weight: Decimal,
    pub status: DispatchStatus,
    pub bucket_vendor_id: i64,
    pub labour_vendor_id: i64,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = dispatches, treat_none_as_null = true)]
pub struct DispatchFields {
    pub vehicle_id: i64,
    pub delivery_location_id: i64,
    pub material_type: Option<String>,
    pub material_rate: Option<Decimal>,
    pub slip_no: String,
    pub slip_image_path: Option<String>,
    pub gross_weight: Decimal,
    pub tare_weight: Decimal,
    pub net_weight: Decimal,
    pub loader_charges: Option<Decimal>,
    pub loader_auto: bool,
    pub loader_charge_type: ChargeType,
    pub labor_charges: Option<Decimal>,
    pub labor_auto: bool,
    pub labor_charge_type: ChargeType,
    pub transporter_rate: Option<Decimal>,
    pub transporter_auto: bool,
    pub transporter_charge_type: ChargeType,
    pub total_amount: Decimal,
    pub total_deduction: Decimal,
    pub payable_weight: Decimal,
    pub bucket_vendor_id: i64,
    pub labour_vendor_id: i64,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = dispatches)]
pub struct NewDispatch {
    #[diesel(embed)]
    pub fields: DispatchFields,
    pub status: DispatchStatus,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = dispatch_receipts)]
pub struct DispatchReceipt {
    pub id: i64,
    pub dispatch_id: i64,
    pub vendor_id: i64,
    pub vehicle_id: Option<i64>,
    pub slip_no: Option<String>,
    pub slip_image_path: Option<String>,
    pub gross_weight: Decimal,
    pub tare_weight: Decimal,
    pub net_weight: Decimal,
    pub material_type: Option<String>,
    pub material_rate: Option<Decimal>,
    pub amount_gross: Decimal,
    pub penalty_amount: Decimal,
    pub other_deduction: Decimal,
    pub advances_applied: Decimal,
    pub amount_payable: Decimal,
    pub remarks: Option<String>,
    pub status: ReceiptStatus,
    pub posted_at: Option<NaiveDateTime>,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
}

/// Columns a receipt create or update writes verbatim from the request.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = dispatch_receipts, treat_none_as_null = true)]
pub struct ReceiptFields {
    pub dispatch_id: i64,
    pub vendor_id: i64,
    pub vehicle_id: Option<i64>,
    pub slip_no: Option<String>,
    pub gross_weight: Decimal,
    pub tare_weight: Decimal,
    pub net_weight: Decimal,
    pub material_type: Option<String>,
    pub material_rate: Option<Decimal>,
    pub amount_gross: Decimal,
    pub penalty_amount: Decimal,
    pub other_deduction: Decimal,
    pub advances_applied: Decimal,
    pub remarks: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = dispatch_receipts)]
pub struct NewDispatchReceipt {
    #[diesel(embed)]
    pub fields: ReceiptFields,
    pub slip_image_path: Option<String>,
    pub amount_payable: Decimal,
    pub status: ReceiptStatus,
    pub posted_at: Option<NaiveDateTime>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = dispatch_receipts_log)]
#[diesel(belongs_to(DispatchReceipt, foreign_key = receipt_id))]
pub struct DispatchReceiptLog {
    pub id: i64,
    pub receipt_id: i64,
    pub amount: Decimal,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = dispatch_receipts_log)]
pub struct NewDispatchReceiptLog {
    pub receipt_id: i64,
    pub amount: Decimal,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = ap_ledger)]
pub struct ApLedgerEntry {
    pub id: i64,
    pub vendor_id: i64,
    pub happened_at: NaiveDateTime,
    pub entry_kind: EntryKind,
    pub amount: Decimal,
    pub currency: String,
    pub dispatch_id: Option<i64>,
    pub cash_id: Option<i64>,
    pub reference_no: Option<String>,
    pub remarks: Option<String>,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = ap_ledger)]
pub struct NewApLedgerEntry {
    pub vendor_id: i64,
    pub happened_at: NaiveDateTime,
    pub entry_kind: EntryKind,
    pub amount: Decimal,
    pub currency: String,
    pub dispatch_id: Option<i64>,
    pub cash_id: Option<i64>,
    pub reference_no: Option<String>,
    pub remarks: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = cashbook)]
pub struct CashEntry {
    pub id: i64,
    pub happened_at: NaiveDateTime,
    pub cash_kind_id: i64,
    pub amount: Decimal,
    pub currency: String,
    pub money_account_id: Option<i64>,
    pub wallet_employee_id: Option<i64>,
    pub category_id: i64,
    pub cost_center_id: i64,
    pub cost_center_sub_id: Option<i64>,
    pub payment_mode_id: i64,
    pub reference_no: Option<String>,
    pub counterparty: Option<String>,
    pub remarks: Option<String>,
    pub metadata: serde_json::Value,
    pub status: CashStatus,
    pub receipt_path: Option<String>,
    pub dispatch_id: Option<i64>,
    pub created_by: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cashbook)]
pub struct NewCashEntry {
    pub happened_at: NaiveDateTime,
    pub cash_kind_id: i64,
    pub amount: Decimal,
    pub currency: String,
    pub money_account_id: Option<i64>,
    pub wallet_employee_id: Option<i64>,
    pub category_id: i64,
    pub cost_center_id: i64,
    pub cost_center_sub_id: Option<i64>,
    pub payment_mode_id: i64,
    pub reference_no: Option<String>,
    pub counterparty: Option<String>,
    pub remarks: Option<String>,
    pub metadata: serde_json::Value,
    pub status: CashStatus,
    pub receipt_path: Option<String>,
    pub dispatch_id: Option<i64>,
    pub created_by: Uuid,
}
