use crate::domain::unit::CatalogUnit;
use anyhow::Result;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct CatalogRepo {
    pub pool: PgPool,
}

pub struct UpsertUnitInput {
    pub event_id: String,
    pub unit_name: String,
    pub unit_price_minor: i64,
    pub total_capacity: i32,
}

impl CatalogRepo {
    pub async fn get_unit(&self, unit_id: &str) -> Result<Option<CatalogUnit>> {
        let row = sqlx::query(
            r#"
            SELECT unit_id, event_id, unit_name, unit_price_minor,
                   total_capacity, reserved, confirmed
            FROM bookable_units
            WHERE unit_id = $1
            "#,
        )
        .bind(unit_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| CatalogUnit {
            unit_id: r.get("unit_id"),
            event_id: r.get("event_id"),
            unit_name: r.get("unit_name"),
            unit_price_minor: r.get("unit_price_minor"),
            total_capacity: r.get("total_capacity"),
            reserved: r.get("reserved"),
            confirmed: r.get("confirmed"),
        }))
    }

    /// Seeds or updates a unit. Total capacity is immutable once created;
    /// the conflict arm deliberately leaves it and the counters alone.
    pub async fn upsert_unit(&self, unit_id: &str, input: &UpsertUnitInput) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookable_units (unit_id, event_id, unit_name, unit_price_minor, total_capacity)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (unit_id) DO UPDATE SET
                event_id = EXCLUDED.event_id,
                unit_name = EXCLUDED.unit_name,
                unit_price_minor = EXCLUDED.unit_price_minor
            "#,
        )
        .bind(unit_id)
        .bind(&input.event_id)
        .bind(&input.unit_name)
        .bind(input.unit_price_minor)
        .bind(input.total_capacity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
