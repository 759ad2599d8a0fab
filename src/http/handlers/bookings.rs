use crate::domain::booking::{CancelActor, CreateBookingRequest, SubmitPaymentRequest};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

pub async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBookingRequest>,
) -> impl IntoResponse {
    let caller = caller_id(&headers);
    match state.booking_service.create(&caller, req).await {
        Ok(view) => (axum::http::StatusCode::CREATED, Json(view)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.booking_service.get(booking_id).await {
        Ok(view) => (axum::http::StatusCode::OK, Json(view)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn submit_payment(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<SubmitPaymentRequest>,
) -> impl IntoResponse {
    match state
        .booking_service
        .submit_payment(booking_id, &req.payment_reference)
        .await
    {
        Ok(resp) => (axum::http::StatusCode::OK, Json(resp)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let caller = caller_id(&headers);
    match state
        .booking_service
        .cancel(booking_id, CancelActor::Buyer, Some(&caller))
        .await
    {
        Ok(view) => (axum::http::StatusCode::OK, Json(view)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

/// Gateway-callback confirmation, mounted behind the admin token.
pub async fn confirm_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.booking_service.confirm(booking_id).await {
        Ok(view) => (axum::http::StatusCode::OK, Json(view)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn health() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "ok")
}

fn caller_id(headers: &HeaderMap) -> String {
    headers
        .get("X-Caller-Id")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string()
}
