use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diesel::result::DatabaseErrorKind;
use serde::Serialize;
use std::fmt::Display;
use tracing::error;

use crate::{
    ap_ledger::LedgerError, cashbook::CashbookError, dispatches::DispatchError,
    receipts::ReceiptError, settlement::SettlementError, uploads::UploadError,
};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn not_found_with(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        if status.is_server_error() {
            error!(status = %status, message = %self.message, "request failed");
        }
        let body = Json(ErrorResponse {
            success: false,
            message: self.message,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => AppError::not_found(),
            diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                AppError::bad_request(format!("invalid reference: {}", info.message()))
            }
            diesel::result::Error::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
                AppError::bad_request(format!("constraint violated: {}", info.message()))
            }
            _ => AppError::internal(value),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::bad_request(format!("invalid JSON payload: {value}"))
    }
}

impl From<DispatchError> for AppError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::NotFound(_) => AppError::not_found_with(value.to_string()),
            DispatchError::NoTransporterVendor => AppError::internal(value),
            DispatchError::HasReceipts { .. }
            | DispatchError::InvalidReference(_)
            | DispatchError::Validation(_) => AppError::bad_request(value.to_string()),
            DispatchError::Database(err) => AppError::from(err),
        }
    }
}

impl From<ReceiptError> for AppError {
    fn from(value: ReceiptError) -> Self {
        match value {
            ReceiptError::NotFound(_) => AppError::not_found_with(value.to_string()),
            ReceiptError::Database(err) => AppError::from(err),
            ReceiptError::Upload(err) => AppError::from(err),
            other => AppError::bad_request(other.to_string()),
        }
    }
}

impl From<SettlementError> for AppError {
    fn from(value: SettlementError) -> Self {
        match value {
            SettlementError::ReceiptNotFound(_) => AppError::not_found_with(value.to_string()),
            SettlementError::Database(err) => AppError::from(err),
            other => AppError::bad_request(other.to_string()),
        }
    }
}

impl From<CashbookError> for AppError {
    fn from(value: CashbookError) -> Self {
        match value {
            CashbookError::NotFound(_) => AppError::not_found_with(value.to_string()),
            CashbookError::Database(err) => AppError::from(err),
            CashbookError::Upload(err) => AppError::from(err),
            other => AppError::bad_request(other.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::VendorNotFound(_) => AppError::not_found_with(value.to_string()),
            LedgerError::Database(err) => AppError::from(err),
        }
    }
}

impl From<UploadError> for AppError {
    fn from(value: UploadError) -> Self {
        match value {
            UploadError::Storage(err) => {
                AppError::internal(format!("failed to store upload: {err}"))
            }
            other => AppError::bad_request(other.to_string()),
        }
    }
}
