use booking_engine::domain::booking::{BookingStatus, CancelActor};
use booking_engine::gateways::VerificationStatus;
use booking_engine::service::lifecycle::{
    cancel_disposition, classify_verification, payment_submission_allowed, CancelBlock,
    CancelDisposition, SubmitBlock, VerificationDirective,
};
use chrono::{Duration, Utc};

#[test]
fn status_transitions_follow_the_state_machine() {
    use BookingStatus::*;

    assert!(Pending.can_transition_to(Confirmed));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Pending.can_transition_to(Expired));
    assert!(Confirmed.can_transition_to(Refunded));

    // Nothing leaves CONFIRMED except REFUNDED; nothing re-enters PENDING.
    assert!(!Confirmed.can_transition_to(Pending));
    assert!(!Confirmed.can_transition_to(Cancelled));
    assert!(!Confirmed.can_transition_to(Expired));
    assert!(!Cancelled.can_transition_to(Pending));
    assert!(!Expired.can_transition_to(Confirmed));
    assert!(!Refunded.can_transition_to(Pending));
}

#[test]
fn buyer_can_cancel_only_pending_bookings() {
    assert_eq!(
        cancel_disposition(BookingStatus::Pending, CancelActor::Buyer),
        Ok(CancelDisposition::Cancel)
    );
    assert_eq!(
        cancel_disposition(BookingStatus::Confirmed, CancelActor::Buyer),
        Err(CancelBlock::AdminOnly)
    );
}

#[test]
fn admin_cancel_of_confirmed_becomes_refund() {
    assert_eq!(
        cancel_disposition(BookingStatus::Confirmed, CancelActor::Admin),
        Ok(CancelDisposition::Refund)
    );
}

#[test]
fn settled_bookings_cannot_be_cancelled_again() {
    for status in [
        BookingStatus::Cancelled,
        BookingStatus::Expired,
        BookingStatus::Refunded,
    ] {
        assert_eq!(
            cancel_disposition(status, CancelActor::Admin),
            Err(CancelBlock::AlreadyTerminal(status))
        );
    }
}

#[test]
fn payment_is_accepted_while_pending_and_inside_the_deadline() {
    let now = Utc::now();
    assert!(payment_submission_allowed(
        BookingStatus::Pending,
        now + Duration::minutes(10),
        0,
        3,
        now
    )
    .is_ok());
}

#[test]
fn payment_is_blocked_after_the_deadline() {
    let now = Utc::now();
    assert_eq!(
        payment_submission_allowed(BookingStatus::Pending, now - Duration::seconds(1), 0, 3, now),
        Err(SubmitBlock::DeadlinePassed)
    );
}

#[test]
fn payment_is_blocked_outside_pending() {
    let now = Utc::now();
    assert_eq!(
        payment_submission_allowed(
            BookingStatus::Confirmed,
            now + Duration::minutes(10),
            0,
            3,
            now
        ),
        Err(SubmitBlock::NotPending(BookingStatus::Confirmed))
    );
}

#[test]
fn payment_is_blocked_once_attempts_run_out() {
    let now = Utc::now();
    assert_eq!(
        payment_submission_allowed(BookingStatus::Pending, now + Duration::minutes(10), 3, 3, now),
        Err(SubmitBlock::AttemptsExhausted)
    );
}

#[test]
fn verified_payment_confirms_the_booking() {
    let verified = VerificationStatus::Verified {
        amount_minor: Some(800),
    };
    assert_eq!(
        classify_verification(&verified, 800, 1, 3),
        VerificationDirective::Confirm
    );
}

#[test]
fn verified_amount_without_figure_is_trusted() {
    let verified = VerificationStatus::Verified { amount_minor: None };
    assert_eq!(
        classify_verification(&verified, 800, 1, 3),
        VerificationDirective::Confirm
    );
}

#[test]
fn short_payment_counts_as_rejected() {
    let short = VerificationStatus::Verified {
        amount_minor: Some(799),
    };
    assert_eq!(
        classify_verification(&short, 800, 1, 3),
        VerificationDirective::Reject { cancel: false }
    );
}

#[test]
fn rejection_cancels_only_after_the_last_attempt() {
    let rejected = VerificationStatus::Rejected { reason: None };
    assert_eq!(
        classify_verification(&rejected, 800, 2, 3),
        VerificationDirective::Reject { cancel: false }
    );
    assert_eq!(
        classify_verification(&rejected, 800, 3, 3),
        VerificationDirective::Reject { cancel: true }
    );
}

#[test]
fn unsettled_gateway_answer_waits_for_callback() {
    assert_eq!(
        classify_verification(&VerificationStatus::Pending, 800, 1, 3),
        VerificationDirective::AwaitCallback
    );
}

#[test]
fn terminal_statuses_are_exactly_the_non_resumable_ones() {
    assert!(!BookingStatus::Pending.is_terminal());
    assert!(!BookingStatus::Confirmed.is_terminal());
    assert!(BookingStatus::Cancelled.is_terminal());
    assert!(BookingStatus::Expired.is_terminal());
    assert!(BookingStatus::Refunded.is_terminal());
}

#[test]
fn status_round_trips_through_storage_form() {
    for status in [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
        BookingStatus::Expired,
        BookingStatus::Refunded,
    ] {
        assert_eq!(BookingStatus::parse(status.as_db()), Some(status));
    }
    assert_eq!(BookingStatus::parse("ARCHIVED"), None);
}
