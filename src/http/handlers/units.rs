use crate::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

pub async fn get_availability(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
) -> impl IntoResponse {
    match state.catalog_repo.get_unit(&unit_id).await {
        Ok(Some(unit)) => (
            axum::http::StatusCode::OK,
            Json(json!({
                "unit_id": unit.unit_id,
                "event_id": unit.event_id,
                "total_capacity": unit.total_capacity,
                "reserved": unit.reserved,
                "confirmed": unit.confirmed,
                "available": unit.available(),
            })),
        )
            .into_response(),
        Ok(None) => (
            axum::http::StatusCode::NOT_FOUND,
            Json(json!({ "error": { "code": "NOT_FOUND", "message": format!("no bookable unit {unit_id}") } })),
        )
            .into_response(),
        Err(e) => (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "code": "INTERNAL_ERROR", "message": e.to_string() } })),
        )
            .into_response(),
    }
}
