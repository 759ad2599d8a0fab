use crate::discounts::evaluator;
use crate::domain::booking::{
    BookingLineView, BookingStatus, BookingView, CancelActor, CreateBookingRequest, ErrorEnvelope,
    ErrorPayload, PaymentOutcome, SubmitPaymentResponse,
};
use crate::domain::discount::{DiscountOrder, DiscountRejection};
use crate::gateways::{GatewayError, PaymentVerifier};
use crate::ledger::{release_all, reserve_many, Hold, InventoryLedger, LedgerError};
use crate::repo::bookings_repo::{BookingsRepo, NewBooking, NewBookingLine, StoredBooking, StoredLine};
use crate::repo::catalog_repo::CatalogRepo;
use crate::repo::discounts_repo::DiscountsRepo;
use crate::repo::outbox_repo::OutboxRepo;
use crate::repo::verification_repo::VerificationRepo;
use crate::service::lifecycle::{
    cancel_disposition, classify_verification, payment_submission_allowed, CancelBlock,
    CancelDisposition, SubmitBlock, VerificationDirective,
};
use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Owner of the booking state machine. Every transition is a
/// status-conditioned single-row update; this service never mutates a
/// booking except through one.
#[derive(Clone)]
pub struct BookingService {
    pub pool: PgPool,
    pub bookings_repo: BookingsRepo,
    pub catalog_repo: CatalogRepo,
    pub discounts_repo: DiscountsRepo,
    pub outbox_repo: OutboxRepo,
    pub verification_repo: VerificationRepo,
    pub ledger: Arc<dyn InventoryLedger>,
    pub verifier: Arc<dyn PaymentVerifier>,
    pub hold_ttl_minutes: i64,
    pub max_payment_attempts: i32,
    pub min_payable_minor: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireOutcome {
    Expired,
    /// Another transition settled the booking first.
    Lost,
}

impl BookingService {
    pub async fn create(
        &self,
        buyer_ref: &str,
        req: CreateBookingRequest,
    ) -> Result<BookingView, (StatusCode, ErrorEnvelope)> {
        validate_request(buyer_ref, &req)?;

        let mut units = Vec::with_capacity(req.lines.len());
        for line in &req.lines {
            let unit = self
                .catalog_repo
                .get_unit(&line.unit_id)
                .await
                .map_err(internal)?
                .ok_or_else(|| {
                    (
                        StatusCode::BAD_REQUEST,
                        err("UNKNOWN_UNIT", &format!("no bookable unit {}", line.unit_id)),
                    )
                })?;
            units.push(unit);
        }

        let gross_minor: i64 = req
            .lines
            .iter()
            .zip(&units)
            .map(|(line, unit)| i64::from(line.quantity) * unit.unit_price_minor)
            .sum();
        let ticket_count: i32 = req.lines.iter().map(|l| l.quantity).sum();

        let wants: Vec<(String, i32)> = req
            .lines
            .iter()
            .map(|l| (l.unit_id.clone(), l.quantity))
            .collect();
        let holds = match reserve_many(self.ledger.as_ref(), &wants).await {
            Ok(holds) => holds,
            Err(LedgerError::InsufficientCapacity(unit_id)) => {
                return Err((
                    StatusCode::CONFLICT,
                    err(
                        "INSUFFICIENT_CAPACITY",
                        &format!("not enough capacity left on unit {unit_id}"),
                    ),
                ));
            }
            Err(LedgerError::UnknownUnit(unit_id)) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    err("UNKNOWN_UNIT", &format!("no bookable unit {unit_id}")),
                ));
            }
            Err(e) => return Err(internal(e.into())),
        };

        let discount = match self
            .price_discount(&req, gross_minor, ticket_count, &holds)
            .await
        {
            Ok(d) => d,
            Err(e) => {
                release_all(self.ledger.as_ref(), &holds).await;
                return Err(e);
            }
        };
        let (discount_code, discount_minor) = match discount {
            Some((code, amount)) => (Some(code), amount),
            None => (None, 0),
        };
        let net_minor = gross_minor - discount_minor;

        let booking_id = Uuid::new_v4();
        let expires_at = chrono::Utc::now() + chrono::Duration::minutes(self.hold_ttl_minutes);
        let new_booking = NewBooking {
            booking_id,
            buyer_ref: buyer_ref.to_string(),
            discount_code: discount_code.clone(),
            discount_minor,
            gross_minor,
            net_minor,
            expires_at,
            lines: req
                .lines
                .iter()
                .zip(&units)
                .zip(&holds)
                .map(|((line, unit), hold)| NewBookingLine {
                    unit_id: line.unit_id.clone(),
                    quantity: line.quantity,
                    unit_price_minor: unit.unit_price_minor,
                    hold_token: hold.token,
                })
                .collect(),
        };

        if let Err(e) = self.persist_new_booking(&new_booking).await {
            // Creation failed after the side effects: give back the holds and
            // the discount use so nothing stays consumed for a dead booking.
            if let Some(code) = &discount_code {
                if let Err(comp_err) = self.discounts_repo.release_redemption(code).await {
                    tracing::error!("failed to roll back redemption of {code}: {comp_err}");
                }
            }
            release_all(self.ledger.as_ref(), &holds).await;
            return Err(internal(e));
        }

        tracing::info!(
            "booking {booking_id} created for {buyer_ref}, net {net_minor} minor, expires {expires_at}"
        );

        self.view(booking_id).await
    }

    pub async fn get(
        &self,
        booking_id: Uuid,
    ) -> Result<BookingView, (StatusCode, ErrorEnvelope)> {
        self.view(booking_id).await
    }

    pub async fn submit_payment(
        &self,
        booking_id: Uuid,
        payment_reference: &str,
    ) -> Result<SubmitPaymentResponse, (StatusCode, ErrorEnvelope)> {
        if payment_reference.trim().is_empty() {
            return Err((
                StatusCode::BAD_REQUEST,
                err("INVALID_REFERENCE", "payment_reference must not be empty"),
            ));
        }

        let booking = self.load(booking_id).await?;
        payment_submission_allowed(
            booking.status,
            booking.expires_at,
            booking.payment_attempts,
            self.max_payment_attempts,
            chrono::Utc::now(),
        )
        .map_err(submit_block)?;

        let recorded = self
            .bookings_repo
            .record_payment_attempt(booking_id, payment_reference, self.max_payment_attempts)
            .await
            .map_err(internal)?;
        if !recorded {
            // Lost a race with confirm/expire or the attempt cap since the read.
            return Err((
                StatusCode::CONFLICT,
                err("INVALID_STATE", "booking is no longer accepting payment"),
            ));
        }
        let attempts = booking.payment_attempts + 1;

        let verification = match self.verifier.check_transaction(payment_reference).await {
            Ok(v) => v,
            Err(GatewayError::Unavailable(detail)) => {
                return Err((
                    StatusCode::SERVICE_UNAVAILABLE,
                    err_with(
                        "GATEWAY_UNAVAILABLE",
                        "payment verifier is unreachable, retry later",
                        Some(detail),
                    ),
                ));
            }
        };

        let directive = classify_verification(
            &verification,
            booking.net_minor,
            attempts,
            self.max_payment_attempts,
        );

        let (outcome, status) = match directive {
            VerificationDirective::Confirm => {
                self.confirm(booking_id).await?;
                (PaymentOutcome::Confirmed, BookingStatus::Confirmed)
            }
            VerificationDirective::Reject { cancel } => {
                if cancel {
                    tracing::warn!(
                        "booking {booking_id} cancelled after {attempts} rejected payment attempts"
                    );
                    self.settle_pending(booking_id, BookingStatus::Cancelled, "booking.cancelled")
                        .await
                        .map_err(internal)?;
                    (PaymentOutcome::Rejected, BookingStatus::Cancelled)
                } else {
                    (PaymentOutcome::Rejected, BookingStatus::Pending)
                }
            }
            VerificationDirective::AwaitCallback => {
                let next_check_at = chrono::Utc::now() + chrono::Duration::minutes(2);
                self.verification_repo
                    .enqueue(booking_id, payment_reference, next_check_at)
                    .await
                    .map_err(internal)?;
                (PaymentOutcome::PendingVerification, BookingStatus::Pending)
            }
        };

        Ok(SubmitPaymentResponse {
            booking_id,
            outcome,
            status,
            attempts_remaining: (self.max_payment_attempts - attempts).max(0),
        })
    }

    pub async fn confirm(
        &self,
        booking_id: Uuid,
    ) -> Result<BookingView, (StatusCode, ErrorEnvelope)> {
        let won = self
            .bookings_repo
            .transition(booking_id, BookingStatus::Pending, BookingStatus::Confirmed)
            .await
            .map_err(internal)?;
        if !won {
            let booking = self.load(booking_id).await?;
            return Err((
                StatusCode::CONFLICT,
                err_with(
                    "INVALID_STATE",
                    "only a pending booking can be confirmed",
                    Some(booking.status.as_db().to_string()),
                ),
            ));
        }

        let lines = self.bookings_repo.lines(booking_id).await.map_err(internal)?;
        for line in &lines {
            self.ledger
                .commit(line.hold_token)
                .await
                .map_err(|e| internal(e.into()))?;
        }

        self.emit_event(booking_id, "booking.confirmed", json!({ "booking_id": booking_id }))
            .await
            .map_err(internal)?;
        tracing::info!("booking {booking_id} confirmed");

        self.view(booking_id).await
    }

    pub async fn cancel(
        &self,
        booking_id: Uuid,
        actor: CancelActor,
        caller: Option<&str>,
    ) -> Result<BookingView, (StatusCode, ErrorEnvelope)> {
        let booking = self.load(booking_id).await?;

        if actor == CancelActor::Buyer && caller != Some(booking.buyer_ref.as_str()) {
            return Err((
                StatusCode::FORBIDDEN,
                err("FORBIDDEN", "caller does not own this booking"),
            ));
        }

        match cancel_disposition(booking.status, actor).map_err(cancel_block)? {
            CancelDisposition::Cancel => {
                let won = self
                    .settle_pending(booking_id, BookingStatus::Cancelled, "booking.cancelled")
                    .await
                    .map_err(internal)?;
                if !won {
                    return Err((
                        StatusCode::CONFLICT,
                        err("INVALID_STATE", "booking already settled"),
                    ));
                }
            }
            CancelDisposition::Refund => {
                // Refunded capacity is not returned to the pool: the seat was
                // issued and must not be sold twice.
                let won = self
                    .bookings_repo
                    .transition(booking_id, BookingStatus::Confirmed, BookingStatus::Refunded)
                    .await
                    .map_err(internal)?;
                if !won {
                    return Err((
                        StatusCode::CONFLICT,
                        err("INVALID_STATE", "booking already settled"),
                    ));
                }
                self.emit_event(booking_id, "booking.refunded", json!({ "booking_id": booking_id }))
                    .await
                    .map_err(internal)?;
            }
        }

        tracing::info!("booking {booking_id} cancelled by {actor:?}");
        self.view(booking_id).await
    }

    /// Reaper-only. Loses quietly when confirm/cancel won the race; the
    /// conditional transition is what makes overlapping sweeps safe.
    pub async fn expire(&self, booking_id: Uuid) -> anyhow::Result<ExpireOutcome> {
        let won = self
            .settle_pending(booking_id, BookingStatus::Expired, "booking.expired")
            .await?;
        Ok(if won {
            ExpireOutcome::Expired
        } else {
            ExpireOutcome::Lost
        })
    }

    /// PENDING -> terminal transition plus hold release and event emission.
    /// Returns false without side effects when the conditional update loses.
    async fn settle_pending(
        &self,
        booking_id: Uuid,
        to: BookingStatus,
        event_type: &str,
    ) -> anyhow::Result<bool> {
        let won = self
            .bookings_repo
            .transition(booking_id, BookingStatus::Pending, to)
            .await?;
        if !won {
            return Ok(false);
        }

        let lines = self.bookings_repo.lines(booking_id).await?;
        let holds: Vec<Hold> = lines
            .iter()
            .map(|l| Hold {
                token: l.hold_token,
                unit_id: l.unit_id.clone(),
                quantity: l.quantity,
            })
            .collect();
        release_all(self.ledger.as_ref(), &holds).await;

        self.emit_event(booking_id, event_type, json!({ "booking_id": booking_id }))
            .await?;
        Ok(true)
    }

    /// Validates and consumes the discount code. `Ok(None)` means no code was
    /// sent; on error the caller still owns the holds and must compensate.
    async fn price_discount(
        &self,
        req: &CreateBookingRequest,
        gross_minor: i64,
        ticket_count: i32,
        holds: &[Hold],
    ) -> Result<Option<(String, i64)>, (StatusCode, ErrorEnvelope)> {
        let Some(code_raw) = &req.discount_code else {
            return Ok(None);
        };

        let code = self
            .discounts_repo
            .find_by_code(code_raw)
            .await
            .map_err(internal)?
            .ok_or_else(|| invalid_discount(DiscountRejection::UnknownCode))?;

        let order = DiscountOrder {
            unit_ids: holds.iter().map(|h| h.unit_id.clone()).collect(),
            ticket_count,
            order_value_minor: gross_minor,
        };
        let amount = evaluator::evaluate(&code, &order, chrono::Utc::now(), self.min_payable_minor)
            .map_err(invalid_discount)?;

        // The evaluator saw a snapshot; the increment re-checks the cap
        // atomically so concurrent redemptions cannot exceed it.
        let redeemed = self
            .discounts_repo
            .redeem(&code.code)
            .await
            .map_err(internal)?;
        if !redeemed {
            return Err(invalid_discount(DiscountRejection::UsageCapReached));
        }

        Ok(Some((code.code, amount)))
    }

    async fn persist_new_booking(&self, data: &NewBooking) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        BookingsRepo::insert_booking_tx(&mut tx, data).await?;
        OutboxRepo::insert_tx(
            &mut tx,
            data.booking_id,
            "booking.created",
            json!({
                "booking_id": data.booking_id,
                "buyer_ref": data.buyer_ref,
                "gross_minor": data.gross_minor,
                "net_minor": data.net_minor,
                "expires_at": data.expires_at,
            }),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn emit_event(
        &self,
        booking_id: Uuid,
        event_type: &str,
        payload: serde_json::Value,
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        OutboxRepo::insert_tx(&mut tx, booking_id, event_type, payload).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn load(
        &self,
        booking_id: Uuid,
    ) -> Result<StoredBooking, (StatusCode, ErrorEnvelope)> {
        self.bookings_repo
            .find(booking_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| {
                (
                    StatusCode::NOT_FOUND,
                    err("NOT_FOUND", &format!("no booking {booking_id}")),
                )
            })
    }

    async fn view(
        &self,
        booking_id: Uuid,
    ) -> Result<BookingView, (StatusCode, ErrorEnvelope)> {
        let booking = self.load(booking_id).await?;
        let lines = self.bookings_repo.lines(booking_id).await.map_err(internal)?;
        Ok(to_view(booking, lines))
    }
}

fn to_view(booking: StoredBooking, lines: Vec<StoredLine>) -> BookingView {
    BookingView {
        booking_id: booking.booking_id,
        buyer_ref: booking.buyer_ref,
        status: booking.status,
        lines: lines
            .into_iter()
            .map(|l| BookingLineView {
                unit_id: l.unit_id,
                quantity: l.quantity,
                unit_price_minor: l.unit_price_minor,
            })
            .collect(),
        discount_code: booking.discount_code,
        discount_minor: booking.discount_minor,
        gross_minor: booking.gross_minor,
        net_minor: booking.net_minor,
        payment_reference: booking.payment_reference,
        expires_at: booking.expires_at,
        confirmed_at: booking.confirmed_at,
        created_at: booking.created_at,
    }
}

fn validate_request(
    buyer_ref: &str,
    req: &CreateBookingRequest,
) -> Result<(), (StatusCode, ErrorEnvelope)> {
    if buyer_ref.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            err("MISSING_CALLER", "X-Caller-Id header is required"),
        ));
    }
    if req.lines.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            err("EMPTY_ORDER", "at least one line item is required"),
        ));
    }
    if req.lines.iter().any(|l| l.quantity <= 0) {
        return Err((
            StatusCode::BAD_REQUEST,
            err("INVALID_QUANTITY", "line quantities must be > 0"),
        ));
    }
    let mut seen = HashSet::new();
    if !req.lines.iter().all(|l| seen.insert(l.unit_id.as_str())) {
        return Err((
            StatusCode::BAD_REQUEST,
            err("DUPLICATE_UNIT", "each unit may appear in at most one line"),
        ));
    }
    Ok(())
}

fn invalid_discount(rejection: DiscountRejection) -> (StatusCode, ErrorEnvelope) {
    (
        StatusCode::BAD_REQUEST,
        err_with(
            "INVALID_DISCOUNT",
            "discount code was not applied",
            Some(rejection.reason_code().to_string()),
        ),
    )
}

fn submit_block(block: SubmitBlock) -> (StatusCode, ErrorEnvelope) {
    let (code, message) = match block {
        SubmitBlock::NotPending(status) => (
            "INVALID_STATE",
            format!("payment is not accepted in status {}", status.as_db()),
        ),
        SubmitBlock::DeadlinePassed => (
            "INVALID_STATE",
            "payment window has closed for this booking".to_string(),
        ),
        SubmitBlock::AttemptsExhausted => (
            "INVALID_STATE",
            "payment resubmission limit reached".to_string(),
        ),
    };
    (StatusCode::CONFLICT, err(code, &message))
}

fn cancel_block(block: CancelBlock) -> (StatusCode, ErrorEnvelope) {
    match block {
        CancelBlock::AlreadyTerminal(status) => (
            StatusCode::CONFLICT,
            err_with(
                "INVALID_STATE",
                "booking is already settled",
                Some(status.as_db().to_string()),
            ),
        ),
        CancelBlock::AdminOnly => (
            StatusCode::FORBIDDEN,
            err("FORBIDDEN", "only an admin can refund a confirmed booking"),
        ),
    }
}

fn err(code: &str, message: &str) -> ErrorEnvelope {
    err_with(code, message, None)
}

fn err_with(code: &str, message: &str, details: Option<String>) -> ErrorEnvelope {
    ErrorEnvelope {
        error: ErrorPayload {
            code: code.to_string(),
            message: message.to_string(),
            details,
        },
    }
}

fn internal(e: anyhow::Error) -> (StatusCode, ErrorEnvelope) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        err("INTERNAL_ERROR", &e.to_string()),
    )
}
