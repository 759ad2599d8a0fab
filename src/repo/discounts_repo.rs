use crate::domain::discount::{DiscountCode, DiscountKind};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct DiscountsRepo {
    pub pool: PgPool,
}

pub struct UpsertDiscountInput {
    pub kind: DiscountKind,
    pub value: i64,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub usage_cap: Option<i32>,
    pub min_tickets: Option<i32>,
    pub min_order_minor: Option<i64>,
    pub restricted_unit_id: Option<String>,
    pub is_active: bool,
}

impl DiscountsRepo {
    pub async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>> {
        let row = sqlx::query(
            r#"
            SELECT code, kind, value, starts_at, ends_at, usage_cap, usage_count,
                   min_tickets, min_order_minor, restricted_unit_id, is_active
            FROM discount_codes
            WHERE code = lower($1)
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            let kind: String = r.get("kind");
            Ok(DiscountCode {
                code: r.get("code"),
                kind: DiscountKind::parse(&kind)
                    .ok_or_else(|| anyhow::anyhow!("unknown discount kind {kind}"))?,
                value: r.get("value"),
                starts_at: r.get("starts_at"),
                ends_at: r.get("ends_at"),
                usage_cap: r.get("usage_cap"),
                usage_count: r.get("usage_count"),
                min_tickets: r.get("min_tickets"),
                min_order_minor: r.get("min_order_minor"),
                restricted_unit_id: r.get("restricted_unit_id"),
                is_active: r.get("is_active"),
            })
        })
        .transpose()
    }

    /// Consumes one use of the code. The cap check and the increment are one
    /// conditional update, so concurrent redemptions can never push the
    /// counter past the cap; losing the race reads as a false return.
    pub async fn redeem(&self, code: &str) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE discount_codes
            SET usage_count = usage_count + 1, updated_at = now()
            WHERE code = lower($1)
              AND is_active
              AND (usage_cap IS NULL OR usage_count < usage_cap)
            "#,
        )
        .bind(code)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected() == 1)
    }

    /// Compensation for a booking creation that failed after `redeem`. This is
    /// the only path that ever decrements a usage counter.
    pub async fn release_redemption(&self, code: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE discount_codes
            SET usage_count = GREATEST(usage_count - 1, 0), updated_at = now()
            WHERE code = lower($1)
            "#,
        )
        .bind(code)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn upsert(&self, code: &str, input: &UpsertDiscountInput) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO discount_codes (
                code, kind, value, starts_at, ends_at, usage_cap,
                min_tickets, min_order_minor, restricted_unit_id, is_active
            ) VALUES (lower($1), $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (code) DO UPDATE SET
                kind = EXCLUDED.kind,
                value = EXCLUDED.value,
                starts_at = EXCLUDED.starts_at,
                ends_at = EXCLUDED.ends_at,
                usage_cap = EXCLUDED.usage_cap,
                min_tickets = EXCLUDED.min_tickets,
                min_order_minor = EXCLUDED.min_order_minor,
                restricted_unit_id = EXCLUDED.restricted_unit_id,
                is_active = EXCLUDED.is_active,
                updated_at = now()
            "#,
        )
        .bind(code)
        .bind(input.kind.as_db())
        .bind(input.value)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.usage_cap)
        .bind(input.min_tickets)
        .bind(input.min_order_minor)
        .bind(&input.restricted_unit_id)
        .bind(input.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
