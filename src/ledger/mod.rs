use uuid::Uuid;

pub mod memory;
pub mod postgres;

/// A hold on capacity pending payment. The token identifies the hold for
/// later commit or release.
#[derive(Debug, Clone)]
pub struct Hold {
    pub token: Uuid,
    pub unit_id: String,
    pub quantity: i32,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient capacity on unit {0}")]
    InsufficientCapacity(String),
    #[error("unknown unit {0}")]
    UnknownUnit(String),
    #[error("unknown hold {0}")]
    UnknownHold(Uuid),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Storage(anyhow::Error::new(e))
    }
}

/// Per-unit capacity accounting. Implementations must make the capacity
/// check and the counter increment one atomic operation: two concurrent
/// `reserve` calls on the same unit must never both succeed when their
/// combined quantity exceeds what remains.
#[async_trait::async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Claims `quantity` from the unit's remaining capacity, or fails with
    /// `InsufficientCapacity`. That failure is a routine outcome, not a fault.
    async fn reserve(&self, unit_id: &str, quantity: i32) -> Result<Hold, LedgerError>;

    /// Moves the held quantity from reserved to confirmed. Idempotent per token.
    async fn commit(&self, token: Uuid) -> Result<(), LedgerError>;

    /// Returns the held quantity to the pool. Idempotent per token.
    async fn release(&self, token: Uuid) -> Result<(), LedgerError>;
}

/// All-or-nothing reservation across several units: if any unit fails, every
/// hold already taken in this request is released before the error returns.
pub async fn reserve_many(
    ledger: &dyn InventoryLedger,
    wants: &[(String, i32)],
) -> Result<Vec<Hold>, LedgerError> {
    let mut holds: Vec<Hold> = Vec::with_capacity(wants.len());
    for (unit_id, quantity) in wants {
        match ledger.reserve(unit_id, *quantity).await {
            Ok(hold) => holds.push(hold),
            Err(e) => {
                for hold in &holds {
                    if let Err(rollback_err) = ledger.release(hold.token).await {
                        tracing::warn!(
                            "failed to roll back hold {} on {}: {}",
                            hold.token,
                            hold.unit_id,
                            rollback_err
                        );
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(holds)
}

/// Releases a set of holds, logging rather than propagating per-hold failures.
/// Used on compensation paths where the original error must win.
pub async fn release_all(ledger: &dyn InventoryLedger, holds: &[Hold]) {
    for hold in holds {
        if let Err(e) = ledger.release(hold.token).await {
            tracing::warn!("failed to release hold {} on {}: {}", hold.token, hold.unit_id, e);
        }
    }
}
