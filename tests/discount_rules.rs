use booking_engine::discounts::evaluator::evaluate;
use booking_engine::domain::discount::{
    DiscountCode, DiscountKind, DiscountOrder, DiscountRejection,
};
use chrono::{Duration, Utc};
use proptest::prelude::*;

const FLOOR: i64 = 1;

#[test]
fn percentage_discount_prices_the_order() {
    let code = percent_code(20);
    let amount = evaluate(&code, &order(1000, 2), Utc::now(), FLOOR).unwrap();
    assert_eq!(amount, 200);
}

#[test]
fn fixed_discount_never_exceeds_order_value() {
    let mut code = percent_code(0);
    code.kind = DiscountKind::Fixed;
    code.value = 500;

    let amount = evaluate(&code, &order(300, 1), Utc::now(), 0).unwrap();
    assert_eq!(amount, 300);
}

#[test]
fn fixed_discount_clamps_to_minimum_payable_floor() {
    let mut code = percent_code(0);
    code.kind = DiscountKind::Fixed;
    code.value = 10_000;

    let amount = evaluate(&code, &order(50, 1), Utc::now(), 1).unwrap();
    assert_eq!(amount, 49);
    assert_eq!(50 - amount, 1);
}

#[test]
fn inactive_code_is_rejected_first() {
    let mut code = percent_code(20);
    code.is_active = false;
    // Window is also wrong, but the active flag short-circuits first.
    code.ends_at = Some(Utc::now() - Duration::hours(1));

    let rejection = evaluate(&code, &order(1000, 2), Utc::now(), FLOOR).unwrap_err();
    assert_eq!(rejection, DiscountRejection::Inactive);
}

#[test]
fn code_outside_validity_window_is_rejected() {
    let mut code = percent_code(20);
    code.starts_at = Some(Utc::now() + Duration::hours(1));
    assert_eq!(
        evaluate(&code, &order(1000, 2), Utc::now(), FLOOR).unwrap_err(),
        DiscountRejection::OutsideWindow
    );

    let mut code = percent_code(20);
    code.ends_at = Some(Utc::now() - Duration::hours(1));
    assert_eq!(
        evaluate(&code, &order(1000, 2), Utc::now(), FLOOR).unwrap_err(),
        DiscountRejection::OutsideWindow
    );
}

#[test]
fn exhausted_usage_cap_is_rejected() {
    let mut code = percent_code(20);
    code.usage_cap = Some(10);
    code.usage_count = 10;

    assert_eq!(
        evaluate(&code, &order(1000, 2), Utc::now(), FLOOR).unwrap_err(),
        DiscountRejection::UsageCapReached
    );
}

#[test]
fn minimum_ticket_count_is_enforced() {
    let mut code = percent_code(20);
    code.min_tickets = Some(4);

    assert_eq!(
        evaluate(&code, &order(1000, 2), Utc::now(), FLOOR).unwrap_err(),
        DiscountRejection::MinTicketsNotMet
    );
    assert!(evaluate(&code, &order(1000, 4), Utc::now(), FLOOR).is_ok());
}

#[test]
fn minimum_order_value_is_enforced() {
    let mut code = percent_code(20);
    code.min_order_minor = Some(2000);

    assert_eq!(
        evaluate(&code, &order(1000, 2), Utc::now(), FLOOR).unwrap_err(),
        DiscountRejection::MinOrderValueNotMet
    );
}

#[test]
fn unit_restriction_requires_a_matching_line() {
    let mut code = percent_code(20);
    code.restricted_unit_id = Some("north-stand".to_string());

    assert_eq!(
        evaluate(&code, &order(1000, 2), Utc::now(), FLOOR).unwrap_err(),
        DiscountRejection::UnitNotEligible
    );

    let mut eligible = order(1000, 2);
    eligible.unit_ids.push("north-stand".to_string());
    assert!(evaluate(&code, &eligible, Utc::now(), FLOOR).is_ok());
}

proptest! {
    // Whatever the code shape, the discount never exceeds the order and the
    // net never lands below the floor (or below the order itself when the
    // order is already under the floor).
    #[test]
    fn net_amount_respects_the_floor(
        order_value in 0i64..1_000_000,
        value in 0i64..2_000_000,
        is_percent in any::<bool>(),
        floor in 0i64..10_000,
    ) {
        let mut code = percent_code(0);
        if is_percent {
            code.value = value % 101;
        } else {
            code.kind = DiscountKind::Fixed;
            code.value = value;
        }

        let amount = evaluate(&code, &order(order_value, 1), Utc::now(), floor).unwrap();
        prop_assert!(amount >= 0);
        prop_assert!(amount <= order_value);
        prop_assert!(order_value - amount >= floor.min(order_value));
    }
}

fn percent_code(value: i64) -> DiscountCode {
    DiscountCode {
        code: "save20".to_string(),
        kind: DiscountKind::Percent,
        value,
        starts_at: None,
        ends_at: None,
        usage_cap: None,
        usage_count: 0,
        min_tickets: None,
        min_order_minor: None,
        restricted_unit_id: None,
        is_active: true,
    }
}

fn order(order_value_minor: i64, ticket_count: i32) -> DiscountOrder {
    DiscountOrder {
        unit_ids: vec!["east-stand".to_string()],
        ticket_count,
        order_value_minor,
    }
}
