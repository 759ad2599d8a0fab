use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Queue of bookings whose gateway answer was `Pending`: the background
/// worker re-checks each until it settles or attempts run out.
#[derive(Clone)]
pub struct VerificationRepo {
    pub pool: PgPool,
}

#[derive(Debug, Clone)]
pub struct VerificationRow {
    pub booking_id: Uuid,
    pub payment_reference: String,
    pub next_check_at: DateTime<Utc>,
    pub attempts: i32,
    pub status: String,
}

impl VerificationRepo {
    pub async fn enqueue(
        &self,
        booking_id: Uuid,
        payment_reference: &str,
        next_check_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payment_verifications (booking_id, payment_reference, next_check_at, attempts, status, updated_at)
            VALUES ($1, $2, $3, 0, 'PENDING', now())
            ON CONFLICT (booking_id) DO UPDATE SET
                payment_reference = EXCLUDED.payment_reference,
                next_check_at = EXCLUDED.next_check_at,
                status = 'PENDING',
                updated_at = now()
            "#,
        )
        .bind(booking_id)
        .bind(payment_reference)
        .bind(next_check_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn due_items(&self, limit: i64) -> Result<Vec<VerificationRow>> {
        let rows = sqlx::query(
            r#"
            SELECT booking_id, payment_reference, next_check_at, attempts, status
            FROM payment_verifications
            WHERE status = 'PENDING' AND next_check_at <= now()
            ORDER BY next_check_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| VerificationRow {
                booking_id: r.get("booking_id"),
                payment_reference: r.get("payment_reference"),
                next_check_at: r.get("next_check_at"),
                attempts: r.get("attempts"),
                status: r.get("status"),
            })
            .collect())
    }

    pub async fn mark(
        &self,
        booking_id: Uuid,
        status: &str,
        attempts: i32,
        last_response: serde_json::Value,
        next_check_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE payment_verifications
            SET status = $2, attempts = $3, last_response = $4,
                next_check_at = COALESCE($5, next_check_at), updated_at = now()
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .bind(status)
        .bind(attempts)
        .bind(last_response)
        .bind(next_check_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
