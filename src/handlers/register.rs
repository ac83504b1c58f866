use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};

use crate::app::AppState;
use crate::db::accounts::RegisterData;
use crate::handlers::register_logic::process_registration;

/// `POST /api/register`
///
/// Thin HTTP adapter; the actual pipeline lives in `register_logic`.
pub async fn register_handler(
    Extension(state): Extension<AppState>,
    Json(data): Json<RegisterData>,
) -> impl IntoResponse {
    let (status, body): (StatusCode, serde_json::Value) =
        process_registration(&state, data).await;
    (status, Json(body))
}
