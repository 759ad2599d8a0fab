use crate::repo::outbox_repo::{OutboxEvent, OutboxRepo};
use anyhow::Result;
use chrono::{Duration, Utc};

/// Drains the booking events outbox into a redis stream for downstream
/// consumers (ticket delivery, analytics). Events are only marked published
/// after a successful XADD; failures back off per event.
#[derive(Clone)]
pub struct OutboxRelay {
    pub outbox_repo: OutboxRepo,
    pub redis_client: redis::Client,
    pub stream_key: String,
    pub poll_interval: std::time::Duration,
}

impl OutboxRelay {
    pub async fn run(self) {
        loop {
            if let Err(err) = self.tick().await {
                tracing::error!("outbox relay error: {err}");
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn tick(&self) -> Result<()> {
        let batch = self.outbox_repo.lock_pending(100).await?;
        if batch.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        for event in batch {
            match self.publish(&mut conn, &event).await {
                Ok(()) => self.outbox_repo.mark_published(event.id).await?,
                Err(e) => {
                    let attempts = event.attempts + 1;
                    let backoff = i64::min(300, 2_i64.pow(attempts.min(8) as u32));
                    self.outbox_repo
                        .mark_retry(event.id, attempts, Utc::now() + Duration::seconds(backoff))
                        .await?;
                    tracing::warn!("xadd failed for outbox id {}: {e}", event.id);
                }
            }
        }

        Ok(())
    }

    async fn publish(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        event: &OutboxEvent,
    ) -> Result<()> {
        let payload = serde_json::to_string(&event.payload_json)?;
        let _: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("MAXLEN")
            .arg("~")
            .arg(1_000_000)
            .arg("*")
            .arg("event_type")
            .arg(&event.event_type)
            .arg("event")
            .arg(payload)
            .query_async(conn)
            .await?;
        Ok(())
    }
}
