use crate::domain::discount::{DiscountCode, DiscountKind, DiscountOrder, DiscountRejection};
use chrono::{DateTime, Utc};

/// Validates a loaded code against the order and computes the discount in
/// minor units. Checks short-circuit on the first failure, each with its own
/// reason: active flag, validity window, usage cap, minimum tickets, minimum
/// order value, unit restriction.
pub fn evaluate(
    code: &DiscountCode,
    order: &DiscountOrder,
    now: DateTime<Utc>,
    min_payable_minor: i64,
) -> Result<i64, DiscountRejection> {
    if !code.is_active {
        return Err(DiscountRejection::Inactive);
    }

    if code.starts_at.is_some_and(|start| now < start) || code.ends_at.is_some_and(|end| now > end) {
        return Err(DiscountRejection::OutsideWindow);
    }

    if code.usage_cap.is_some_and(|cap| code.usage_count >= cap) {
        return Err(DiscountRejection::UsageCapReached);
    }

    if code.min_tickets.is_some_and(|min| order.ticket_count < min) {
        return Err(DiscountRejection::MinTicketsNotMet);
    }

    if code
        .min_order_minor
        .is_some_and(|min| order.order_value_minor < min)
    {
        return Err(DiscountRejection::MinOrderValueNotMet);
    }

    if let Some(restricted) = &code.restricted_unit_id {
        if !order.unit_ids.iter().any(|u| u == restricted) {
            return Err(DiscountRejection::UnitNotEligible);
        }
    }

    Ok(amount_for(code, order.order_value_minor, min_payable_minor))
}

/// Raw amount per kind, then clamped so the net never drops below the minimum
/// payable floor. An order already at or below the floor gets no discount.
fn amount_for(code: &DiscountCode, order_value_minor: i64, min_payable_minor: i64) -> i64 {
    let raw = match code.kind {
        DiscountKind::Percent => order_value_minor * code.value / 100,
        DiscountKind::Fixed => code.value.min(order_value_minor),
    };
    raw.min((order_value_minor - min_payable_minor).max(0))
}
