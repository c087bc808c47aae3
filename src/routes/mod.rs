use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::{auth::Actor, state::AppState};

pub mod cashbook;
pub mod dispatches;
pub mod health;
pub mod receipts;
pub mod submission;
pub mod vendors;

/// Multipart framing and the JSON payload part on top of the file itself.
const BODY_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Success envelope shared by every handler. Errors use the same `success` and
/// `message` keys (see [`crate::error::AppError`]).
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data,
        })
    }
}

fn cors_layer(allowed: Option<&String>) -> CorsLayer {
    let allow_origin = match allowed {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(err) => {
                        warn!(origin = value, error = %err, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(tower_http::cors::AllowMethods::mirror_request())
        .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_ref());
    let body_limit = state.upload_limit() + BODY_OVERHEAD_BYTES;

    let dispatch_routes = Router::new()
        .route(
            "/",
            get(dispatches::list_dispatches).post(dispatches::create_dispatch),
        )
        .route(
            "/:id",
            get(dispatches::get_dispatch)
                .put(dispatches::update_dispatch)
                .delete(dispatches::delete_dispatch),
        );

    let receipt_routes = Router::new()
        .route("/", post(receipts::create_receipt))
        .route(
            "/:id",
            get(receipts::get_receipt).put(receipts::update_receipt),
        )
        .route(
            "/:id/payments",
            get(receipts::payment_history).post(receipts::process_payment),
        )
        .route("/:id/slip", get(receipts::slip_url));

    let cashbook_routes = Router::new()
        .route("/", post(cashbook::create_entry))
        .route("/:id/cancel", put(cashbook::cancel_entry))
        .route(
            "/wallets/:employee_id/balance",
            get(cashbook::wallet_balance),
        )
        .route(
            "/wallets/:employee_id/transactions",
            get(cashbook::wallet_transactions),
        )
        .route(
            "/wallets/:employee_id/transactions/last/:days",
            get(cashbook::wallet_transactions_window),
        );

    let vendor_routes = Router::new().route("/:id/ledger", get(vendors::vendor_ledger));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/dispatches", dispatch_routes)
        .nest("/api/dispatch-receipts", receipt_routes)
        .nest("/api/cashbook", cashbook_routes)
        .nest("/api/vendors", vendor_routes)
        .layer(middleware::from_extractor_with_state::<Actor, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
}
