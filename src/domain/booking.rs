use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
    Refunded,
}

impl BookingStatus {
    pub fn as_db(self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Expired => "EXPIRED",
            BookingStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            "EXPIRED" => Some(BookingStatus::Expired),
            "REFUNDED" => Some(BookingStatus::Refunded),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Cancelled | BookingStatus::Expired | BookingStatus::Refunded
        )
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Pending, BookingStatus::Expired)
                | (BookingStatus::Confirmed, BookingStatus::Refunded)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelActor {
    Buyer,
    Admin,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemRequest {
    pub unit_id: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub lines: Vec<LineItemRequest>,
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingLineView {
    pub unit_id: String,
    pub quantity: i32,
    pub unit_price_minor: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub booking_id: Uuid,
    pub buyer_ref: String,
    pub status: BookingStatus,
    pub lines: Vec<BookingLineView>,
    pub discount_code: Option<String>,
    pub discount_minor: i64,
    pub gross_minor: i64,
    pub net_minor: i64,
    pub payment_reference: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitPaymentRequest {
    pub payment_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Confirmed,
    Rejected,
    PendingVerification,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitPaymentResponse {
    pub booking_id: Uuid,
    pub outcome: PaymentOutcome,
    pub status: BookingStatus,
    pub attempts_remaining: i32,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}
