use crate::service::booking_service::{BookingService, ExpireOutcome};
use anyhow::Result;

/// Background sweep over PENDING bookings past their deadline. Safe under
/// overlapping runs: expiry is a status-conditioned transition, so a booking
/// selected by two sweeps releases its inventory exactly once.
#[derive(Clone)]
pub struct ExpiryReaper {
    pub booking_service: BookingService,
    pub interval: std::time::Duration,
    pub batch_size: i64,
}

impl ExpiryReaper {
    pub async fn run(self) {
        loop {
            match self.sweep().await {
                Ok(expired) if expired > 0 => {
                    tracing::info!("reaper expired {expired} stale bookings");
                }
                Ok(_) => {}
                Err(err) => tracing::error!("reaper sweep error: {err}"),
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    pub async fn sweep(&self) -> Result<u64> {
        let due = self
            .booking_service
            .bookings_repo
            .expired_pending(self.batch_size)
            .await?;

        let mut expired = 0;
        for booking_id in due {
            match self.booking_service.expire(booking_id).await {
                Ok(ExpireOutcome::Expired) => expired += 1,
                Ok(ExpireOutcome::Lost) => {}
                Err(err) => tracing::warn!("failed to expire booking {booking_id}: {err}"),
            }
        }

        Ok(expired)
    }
}
