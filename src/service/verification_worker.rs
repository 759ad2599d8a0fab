use crate::gateways::GatewayError;
use crate::repo::verification_repo::{VerificationRepo, VerificationRow};
use crate::service::booking_service::BookingService;
use crate::service::lifecycle::{classify_verification, VerificationDirective};
use anyhow::Result;
use chrono::{Duration, Utc};
use serde_json::json;

/// Re-checks transactions the gateway left unsettled. The submit path
/// enqueues a row per `Pending` answer; this worker polls the gateway until
/// the transaction settles or the attempt budget runs out.
#[derive(Clone)]
pub struct VerificationWorker {
    pub verification_repo: VerificationRepo,
    pub booking_service: BookingService,
    pub interval: std::time::Duration,
    pub max_attempts: i32,
}

impl VerificationWorker {
    pub async fn run(self) {
        loop {
            if let Err(err) = self.tick().await {
                tracing::error!("verification worker error: {err}");
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    async fn tick(&self) -> Result<()> {
        for row in self.verification_repo.due_items(50).await? {
            if let Err(err) = self.recheck(&row).await {
                tracing::warn!(
                    "verification recheck failed for booking {}: {err}",
                    row.booking_id
                );
            }
        }
        Ok(())
    }

    async fn recheck(&self, row: &VerificationRow) -> Result<()> {
        let attempts = row.attempts + 1;
        let verification = match self
            .booking_service
            .verifier
            .check_transaction(&row.payment_reference)
            .await
        {
            Ok(v) => v,
            Err(GatewayError::Unavailable(detail)) => {
                // Transient: keep the row PENDING and try again later.
                self.verification_repo
                    .mark(
                        row.booking_id,
                        "PENDING",
                        attempts,
                        json!({ "error": detail }),
                        Some(Utc::now() + backoff(attempts)),
                    )
                    .await?;
                return Ok(());
            }
        };

        let booking = self
            .booking_service
            .bookings_repo
            .find(row.booking_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("booking {} vanished", row.booking_id))?;

        // The resubmission cap does not apply here: the buyer already
        // submitted, the gateway is just slow to settle.
        match classify_verification(&verification, booking.net_minor, 0, i32::MAX) {
            VerificationDirective::Confirm => {
                if let Err((_, envelope)) = self.booking_service.confirm(row.booking_id).await {
                    // The reaper may have expired the booking while the
                    // gateway sat on the money; record it and move on.
                    tracing::warn!(
                        "late verification could not confirm booking {}: {}",
                        row.booking_id,
                        envelope.error.code
                    );
                }
                self.verification_repo
                    .mark(
                        row.booking_id,
                        "VERIFIED",
                        attempts,
                        json!({ "settled": true }),
                        None,
                    )
                    .await?;
            }
            VerificationDirective::Reject { .. } => {
                self.verification_repo
                    .mark(
                        row.booking_id,
                        "REJECTED",
                        attempts,
                        json!({ "settled": false }),
                        None,
                    )
                    .await?;
            }
            VerificationDirective::AwaitCallback => {
                let status = if attempts >= self.max_attempts {
                    "EXHAUSTED"
                } else {
                    "PENDING"
                };
                self.verification_repo
                    .mark(
                        row.booking_id,
                        status,
                        attempts,
                        json!({ "settled": false }),
                        Some(Utc::now() + backoff(attempts)),
                    )
                    .await?;
            }
        }

        Ok(())
    }
}

fn backoff(attempts: i32) -> Duration {
    Duration::minutes(i64::min(30, 2_i64.pow(attempts.min(8) as u32)))
}
