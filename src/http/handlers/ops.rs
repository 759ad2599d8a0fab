use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let redis_ok = state
        .redis_client
        .get_multiplexed_async_connection()
        .await
        .is_ok();

    let status = if db_ok && redis_ok {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({ "db": db_ok, "redis": redis_ok })))
}

pub async fn liveness() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "alive")
}
