pub mod ap_ledger;
pub mod auth;
pub mod cashbook;
pub mod config;
pub mod db;
pub mod dispatches;
pub mod error;
pub mod models;
pub mod receipts;
pub mod reference;
pub mod routes;
pub mod schema;
pub mod settlement;
pub mod state;
pub mod status;
pub mod storage;
pub mod uploads;

/// Every ledger row in this system is denominated in Pakistani rupees.
pub const CURRENCY: &str = "PKR";
