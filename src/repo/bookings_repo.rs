use crate::domain::booking::BookingStatus;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

pub struct NewBookingLine {
    pub unit_id: String,
    pub quantity: i32,
    pub unit_price_minor: i64,
    pub hold_token: Uuid,
}

pub struct NewBooking {
    pub booking_id: Uuid,
    pub buyer_ref: String,
    pub discount_code: Option<String>,
    pub discount_minor: i64,
    pub gross_minor: i64,
    pub net_minor: i64,
    pub expires_at: DateTime<Utc>,
    pub lines: Vec<NewBookingLine>,
}

#[derive(Debug, Clone)]
pub struct StoredBooking {
    pub booking_id: Uuid,
    pub buyer_ref: String,
    pub status: BookingStatus,
    pub discount_code: Option<String>,
    pub discount_minor: i64,
    pub gross_minor: i64,
    pub net_minor: i64,
    pub payment_reference: Option<String>,
    pub payment_attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredLine {
    pub unit_id: String,
    pub quantity: i32,
    pub unit_price_minor: i64,
    pub hold_token: Uuid,
}

#[derive(Clone)]
pub struct BookingsRepo {
    pub pool: PgPool,
}

impl BookingsRepo {
    pub async fn insert_booking_tx(
        tx: &mut Transaction<'_, Postgres>,
        data: &NewBooking,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                booking_id, buyer_ref, status, discount_code, discount_minor,
                gross_minor, net_minor, expires_at
            ) VALUES ($1, $2, 'PENDING', $3, $4, $5, $6, $7)
            "#,
        )
        .bind(data.booking_id)
        .bind(&data.buyer_ref)
        .bind(&data.discount_code)
        .bind(data.discount_minor)
        .bind(data.gross_minor)
        .bind(data.net_minor)
        .bind(data.expires_at)
        .execute(tx.as_mut())
        .await?;

        for line in &data.lines {
            sqlx::query(
                r#"
                INSERT INTO booking_lines (booking_id, unit_id, quantity, unit_price_minor, hold_token)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(data.booking_id)
            .bind(&line.unit_id)
            .bind(line.quantity)
            .bind(line.unit_price_minor)
            .bind(line.hold_token)
            .execute(tx.as_mut())
            .await?;
        }

        Ok(())
    }

    pub async fn find(&self, booking_id: Uuid) -> Result<Option<StoredBooking>> {
        let row = sqlx::query(
            r#"
            SELECT booking_id, buyer_ref, status, discount_code, discount_minor,
                   gross_minor, net_minor, payment_reference, payment_attempts,
                   expires_at, confirmed_at, created_at
            FROM bookings
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let status: String = r.get("status");
            Ok(StoredBooking {
                booking_id: r.get("booking_id"),
                buyer_ref: r.get("buyer_ref"),
                status: BookingStatus::parse(&status)
                    .ok_or_else(|| anyhow::anyhow!("unknown booking status {status}"))?,
                discount_code: r.get("discount_code"),
                discount_minor: r.get("discount_minor"),
                gross_minor: r.get("gross_minor"),
                net_minor: r.get("net_minor"),
                payment_reference: r.get("payment_reference"),
                payment_attempts: r.get("payment_attempts"),
                expires_at: r.get("expires_at"),
                confirmed_at: r.get("confirmed_at"),
                created_at: r.get("created_at"),
            })
        })
        .transpose()
    }

    pub async fn lines(&self, booking_id: Uuid) -> Result<Vec<StoredLine>> {
        let rows = sqlx::query(
            r#"
            SELECT unit_id, quantity, unit_price_minor, hold_token
            FROM booking_lines
            WHERE booking_id = $1
            ORDER BY unit_id
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StoredLine {
                unit_id: r.get("unit_id"),
                quantity: r.get("quantity"),
                unit_price_minor: r.get("unit_price_minor"),
                hold_token: r.get("hold_token"),
            })
            .collect())
    }

    /// Status-conditioned transition: succeeds only if the row still holds
    /// `from`, so racing transitions resolve to exactly one winner.
    pub async fn transition(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $3,
                confirmed_at = CASE WHEN $3 = 'CONFIRMED' THEN now() ELSE confirmed_at END,
                updated_at = now()
            WHERE booking_id = $1 AND status = $2
            "#,
        )
        .bind(booking_id)
        .bind(from.as_db())
        .bind(to.as_db())
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    /// Records a payment reference while the booking is still PENDING, inside
    /// the deadline and under the resubmission cap. All four conditions sit in
    /// the WHERE clause so the attempt counter cannot over-count under races.
    pub async fn record_payment_attempt(
        &self,
        booking_id: Uuid,
        reference: &str,
        max_attempts: i32,
    ) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE bookings
            SET payment_reference = $2, payment_attempts = payment_attempts + 1, updated_at = now()
            WHERE booking_id = $1
              AND status = 'PENDING'
              AND expires_at > now()
              AND payment_attempts < $3
            "#,
        )
        .bind(booking_id)
        .bind(reference)
        .bind(max_attempts)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    pub async fn expired_pending(&self, limit: i64) -> Result<Vec<Uuid>> {
        let rows = sqlx::query(
            r#"
            SELECT booking_id
            FROM bookings
            WHERE status = 'PENDING' AND expires_at < now()
            ORDER BY expires_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.get("booking_id")).collect())
    }
}
