use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    Percent,
    Fixed,
}

impl DiscountKind {
    pub fn as_db(self) -> &'static str {
        match self {
            DiscountKind::Percent => "PERCENT",
            DiscountKind::Fixed => "FIXED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PERCENT" => Some(DiscountKind::Percent),
            "FIXED" => Some(DiscountKind::Fixed),
            _ => None,
        }
    }
}

/// A discount code row as persisted. Codes are stored lowercased; lookups
/// normalize the caller-supplied spelling.
#[derive(Debug, Clone)]
pub struct DiscountCode {
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_cap: Option<i32>,
    pub usage_count: i32,
    pub min_tickets: Option<i32>,
    pub min_order_minor: Option<i64>,
    pub restricted_unit_id: Option<String>,
    pub is_active: bool,
}

/// Order context a code is priced against.
#[derive(Debug, Clone)]
pub struct DiscountOrder {
    pub unit_ids: Vec<String>,
    pub ticket_count: i32,
    pub order_value_minor: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountRejection {
    UnknownCode,
    Inactive,
    OutsideWindow,
    UsageCapReached,
    MinTicketsNotMet,
    MinOrderValueNotMet,
    UnitNotEligible,
}

impl DiscountRejection {
    pub fn reason_code(self) -> &'static str {
        match self {
            DiscountRejection::UnknownCode => "UNKNOWN_CODE",
            DiscountRejection::Inactive => "CODE_INACTIVE",
            DiscountRejection::OutsideWindow => "OUTSIDE_VALIDITY_WINDOW",
            DiscountRejection::UsageCapReached => "USAGE_CAP_REACHED",
            DiscountRejection::MinTicketsNotMet => "MIN_TICKETS_NOT_MET",
            DiscountRejection::MinOrderValueNotMet => "MIN_ORDER_VALUE_NOT_MET",
            DiscountRejection::UnitNotEligible => "UNIT_NOT_ELIGIBLE",
        }
    }
}
