use crate::domain::booking::CancelActor;
use crate::domain::discount::DiscountKind;
use crate::repo::catalog_repo::UpsertUnitInput;
use crate::repo::discounts_repo::UpsertDiscountInput;
use crate::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct UpsertUnitRequest {
    pub event_id: String,
    pub unit_name: String,
    pub unit_price_minor: i64,
    pub total_capacity: i32,
}

pub async fn upsert_unit(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    Json(req): Json<UpsertUnitRequest>,
) -> impl IntoResponse {
    if req.unit_price_minor < 0 || req.total_capacity < 0 {
        return (
            axum::http::StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "code": "VALIDATION_ERROR", "message": "price and capacity must be >= 0" } })),
        )
            .into_response();
    }

    let input = UpsertUnitInput {
        event_id: req.event_id,
        unit_name: req.unit_name,
        unit_price_minor: req.unit_price_minor,
        total_capacity: req.total_capacity,
    };
    match state.catalog_repo.upsert_unit(&unit_id, &input).await {
        Ok(()) => (axum::http::StatusCode::OK, Json(json!({ "unit_id": unit_id }))).into_response(),
        Err(e) => internal(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpsertDiscountRequest {
    pub kind: DiscountKind,
    pub value: i64,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_cap: Option<i32>,
    pub min_tickets: Option<i32>,
    pub min_order_minor: Option<i64>,
    pub restricted_unit_id: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

pub async fn upsert_discount(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(req): Json<UpsertDiscountRequest>,
) -> impl IntoResponse {
    if req.value < 0 || (req.kind == DiscountKind::Percent && req.value > 100) {
        return (
            axum::http::StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "code": "VALIDATION_ERROR", "message": "discount value out of range" } })),
        )
            .into_response();
    }

    let input = UpsertDiscountInput {
        kind: req.kind,
        value: req.value,
        starts_at: req.starts_at,
        ends_at: req.ends_at,
        usage_cap: req.usage_cap,
        min_tickets: req.min_tickets,
        min_order_minor: req.min_order_minor,
        restricted_unit_id: req.restricted_unit_id,
        is_active: req.is_active,
    };
    match state.discounts_repo.upsert(&code, &input).await {
        Ok(()) => (
            axum::http::StatusCode::OK,
            Json(json!({ "code": code.to_lowercase() })),
        )
            .into_response(),
        Err(e) => internal(e),
    }
}

/// Admin cancel: releases a pending booking, refunds a confirmed one.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> impl IntoResponse {
    match state
        .booking_service
        .cancel(booking_id, CancelActor::Admin, None)
        .await
    {
        Ok(view) => (axum::http::StatusCode::OK, Json(view)).into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn run_sweep(State(state): State<AppState>) -> impl IntoResponse {
    match state.reaper.sweep().await {
        Ok(expired) => (
            axum::http::StatusCode::OK,
            Json(json!({ "expired_count": expired })),
        )
            .into_response(),
        Err(e) => internal(e),
    }
}

fn internal(e: anyhow::Error) -> axum::response::Response {
    (
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": { "code": "INTERNAL_ERROR", "message": e.to_string() } })),
    )
        .into_response()
}
