use crate::ledger::{Hold, InventoryLedger, LedgerError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Ledger over in-process state with the same semantics as the Postgres
/// implementation: the capacity check and increment happen under one lock
/// acquisition, never as separate steps. Backs the concurrency tests and
/// local development without a database.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    units: HashMap<String, Counters>,
    holds: HashMap<Uuid, HoldEntry>,
}

struct Counters {
    total: i32,
    reserved: i32,
    confirmed: i32,
}

struct HoldEntry {
    unit_id: String,
    quantity: i32,
    state: HoldState,
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum HoldState {
    Held,
    Committed,
    Released,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_unit(&self, unit_id: &str, total_capacity: i32) {
        let mut state = self.inner.lock().await;
        state.units.insert(
            unit_id.to_string(),
            Counters {
                total: total_capacity,
                reserved: 0,
                confirmed: 0,
            },
        );
    }

    /// Returns `(total, reserved, confirmed)` for assertions.
    pub async fn counters(&self, unit_id: &str) -> Option<(i32, i32, i32)> {
        let state = self.inner.lock().await;
        state
            .units
            .get(unit_id)
            .map(|c| (c.total, c.reserved, c.confirmed))
    }
}

#[async_trait::async_trait]
impl InventoryLedger for InMemoryLedger {
    async fn reserve(&self, unit_id: &str, quantity: i32) -> Result<Hold, LedgerError> {
        let mut state = self.inner.lock().await;
        let counters = state
            .units
            .get_mut(unit_id)
            .ok_or_else(|| LedgerError::UnknownUnit(unit_id.to_string()))?;

        if counters.total - counters.reserved - counters.confirmed < quantity {
            return Err(LedgerError::InsufficientCapacity(unit_id.to_string()));
        }
        counters.reserved += quantity;

        let token = Uuid::new_v4();
        state.holds.insert(
            token,
            HoldEntry {
                unit_id: unit_id.to_string(),
                quantity,
                state: HoldState::Held,
            },
        );

        Ok(Hold {
            token,
            unit_id: unit_id.to_string(),
            quantity,
        })
    }

    async fn commit(&self, token: Uuid) -> Result<(), LedgerError> {
        self.settle(token, HoldState::Committed).await
    }

    async fn release(&self, token: Uuid) -> Result<(), LedgerError> {
        self.settle(token, HoldState::Released).await
    }
}

impl InMemoryLedger {
    async fn settle(&self, token: Uuid, target: HoldState) -> Result<(), LedgerError> {
        let mut state = self.inner.lock().await;
        let entry = state
            .holds
            .get(&token)
            .ok_or(LedgerError::UnknownHold(token))?;

        if entry.state == target {
            return Ok(());
        }
        if entry.state != HoldState::Held {
            return Err(LedgerError::Storage(anyhow::anyhow!(
                "hold {token} already settled"
            )));
        }

        let unit_id = entry.unit_id.clone();
        let quantity = entry.quantity;
        let counters = state
            .units
            .get_mut(&unit_id)
            .ok_or_else(|| LedgerError::UnknownUnit(unit_id.clone()))?;

        counters.reserved -= quantity;
        if target == HoldState::Committed {
            counters.confirmed += quantity;
        }

        if let Some(entry) = state.holds.get_mut(&token) {
            entry.state = target;
        }
        Ok(())
    }
}
