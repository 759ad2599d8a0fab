use crate::domain::booking::{BookingStatus, CancelActor};
use crate::gateways::VerificationStatus;
use chrono::{DateTime, Utc};

/// What a cancellation does to the booking. A refund keeps its capacity
/// allocated: the seat was sold and may exist as a physical ticket, so it is
/// not returned to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelDisposition {
    /// PENDING -> CANCELLED, holds released back to the pool.
    Cancel,
    /// CONFIRMED -> REFUNDED, capacity stays confirmed.
    Refund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelBlock {
    AlreadyTerminal(BookingStatus),
    AdminOnly,
}

pub fn cancel_disposition(
    status: BookingStatus,
    actor: CancelActor,
) -> Result<CancelDisposition, CancelBlock> {
    match status {
        BookingStatus::Pending => Ok(CancelDisposition::Cancel),
        BookingStatus::Confirmed => match actor {
            CancelActor::Admin => Ok(CancelDisposition::Refund),
            CancelActor::Buyer => Err(CancelBlock::AdminOnly),
        },
        other => Err(CancelBlock::AlreadyTerminal(other)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitBlock {
    NotPending(BookingStatus),
    DeadlinePassed,
    AttemptsExhausted,
}

pub fn payment_submission_allowed(
    status: BookingStatus,
    expires_at: DateTime<Utc>,
    attempts: i32,
    max_attempts: i32,
    now: DateTime<Utc>,
) -> Result<(), SubmitBlock> {
    if status != BookingStatus::Pending {
        return Err(SubmitBlock::NotPending(status));
    }
    if now >= expires_at {
        return Err(SubmitBlock::DeadlinePassed);
    }
    if attempts >= max_attempts {
        return Err(SubmitBlock::AttemptsExhausted);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationDirective {
    Confirm,
    /// Rejected by the gateway; `cancel` is set once resubmissions are spent.
    Reject {
        cancel: bool,
    },
    AwaitCallback,
}

/// Maps a gateway answer onto the booking lifecycle. A verified amount short
/// of the net owed counts as a rejection: the gateway is untrusted and a
/// partial payment must not confirm the booking.
pub fn classify_verification(
    status: &VerificationStatus,
    net_minor: i64,
    attempts: i32,
    max_attempts: i32,
) -> VerificationDirective {
    let out_of_attempts = attempts >= max_attempts;
    match status {
        VerificationStatus::Verified { amount_minor } => {
            if amount_minor.is_none_or(|paid| paid >= net_minor) {
                VerificationDirective::Confirm
            } else {
                VerificationDirective::Reject {
                    cancel: out_of_attempts,
                }
            }
        }
        VerificationStatus::Rejected { .. } => VerificationDirective::Reject {
            cancel: out_of_attempts,
        },
        VerificationStatus::Pending => VerificationDirective::AwaitCallback,
    }
}
