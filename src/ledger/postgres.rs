use crate::ledger::{Hold, InventoryLedger, LedgerError};
use sqlx::{PgPool, Row};
use uuid::Uuid;

const MAX_CONFLICT_RETRIES: u32 = 3;

/// Ledger backed by the `bookable_units` and `inventory_holds` tables. The
/// capacity check and counter increment are a single conditional UPDATE, so
/// oversell cannot slip through a read-then-write gap; the row lock serializes
/// concurrent reservations per unit.
#[derive(Clone)]
pub struct PgInventoryLedger {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl InventoryLedger for PgInventoryLedger {
    async fn reserve(&self, unit_id: &str, quantity: i32) -> Result<Hold, LedgerError> {
        retry_conflicts(|| self.try_reserve(unit_id, quantity)).await
    }

    async fn commit(&self, token: Uuid) -> Result<(), LedgerError> {
        retry_conflicts(|| self.try_settle(token, "COMMITTED")).await
    }

    async fn release(&self, token: Uuid) -> Result<(), LedgerError> {
        retry_conflicts(|| self.try_settle(token, "RELEASED")).await
    }
}

impl PgInventoryLedger {
    async fn try_reserve(&self, unit_id: &str, quantity: i32) -> Result<Hold, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE bookable_units
            SET reserved = reserved + $2
            WHERE unit_id = $1
              AND total_capacity - reserved - confirmed >= $2
            "#,
        )
        .bind(unit_id)
        .bind(quantity)
        .execute(tx.as_mut())
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            let exists = sqlx::query("SELECT 1 FROM bookable_units WHERE unit_id = $1")
                .bind(unit_id)
                .fetch_optional(&self.pool)
                .await?;
            return Err(if exists.is_some() {
                LedgerError::InsufficientCapacity(unit_id.to_string())
            } else {
                LedgerError::UnknownUnit(unit_id.to_string())
            });
        }

        let token = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO inventory_holds (token, unit_id, quantity, state) VALUES ($1, $2, $3, 'HELD')",
        )
        .bind(token)
        .bind(unit_id)
        .bind(quantity)
        .execute(tx.as_mut())
        .await?;

        tx.commit().await?;

        Ok(Hold {
            token,
            unit_id: unit_id.to_string(),
            quantity,
        })
    }

    /// Flips a HELD hold to `target` and adjusts the unit counters in one
    /// transaction. A hold already in `target` is a no-op, which is what makes
    /// commit and release idempotent per token.
    async fn try_settle(&self, token: Uuid, target: &str) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            r#"
            UPDATE inventory_holds
            SET state = $2, updated_at = now()
            WHERE token = $1 AND state = 'HELD'
            RETURNING unit_id, quantity
            "#,
        )
        .bind(token)
        .bind(target)
        .fetch_optional(tx.as_mut())
        .await?;

        let Some(row) = flipped else {
            tx.rollback().await?;
            let state: Option<String> =
                sqlx::query("SELECT state FROM inventory_holds WHERE token = $1")
                    .bind(token)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(|r| r.get("state"));
            return match state {
                None => Err(LedgerError::UnknownHold(token)),
                Some(s) if s == target => Ok(()),
                Some(s) => Err(LedgerError::Storage(anyhow::anyhow!(
                    "hold {token} already settled as {s}"
                ))),
            };
        };

        let unit_id: String = row.get("unit_id");
        let quantity: i32 = row.get("quantity");

        let counter_sql = if target == "COMMITTED" {
            "UPDATE bookable_units SET reserved = reserved - $2, confirmed = confirmed + $2 WHERE unit_id = $1"
        } else {
            "UPDATE bookable_units SET reserved = reserved - $2 WHERE unit_id = $1"
        };
        sqlx::query(counter_sql)
            .bind(&unit_id)
            .bind(quantity)
            .execute(tx.as_mut())
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn retry_conflicts<T, F, Fut>(op: F) -> Result<T, LedgerError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, LedgerError>>,
{
    let mut attempt = 0;
    loop {
        let result = op().await;
        match result {
            Err(ref e) if is_serialization_conflict(e) && attempt + 1 < MAX_CONFLICT_RETRIES => {
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn is_serialization_conflict(err: &LedgerError) -> bool {
    let LedgerError::Storage(inner) = err else {
        return false;
    };
    inner
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .and_then(|db| db.code())
        .is_some_and(|code| code == "40001")
}
