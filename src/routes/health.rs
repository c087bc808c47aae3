use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::{db, state::AppState};

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = state
        .db()
        .map_err(|err| err.message().to_string())
        .and_then(|mut conn| db::ping(&mut conn).map_err(|err| err.to_string()));

    match database {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "success": true, "status": "ok", "database": "ok" })),
        ),
        Err(reason) => {
            warn!(reason = %reason, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "success": false, "status": "degraded", "database": reason })),
            )
        }
    }
}
