use serde::Serialize;

/// A finite pool of sellable inventory: an event's ticket pool or one
/// stadium section. The catalog owns the descriptive fields; the ledger
/// owns the counters.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogUnit {
    pub unit_id: String,
    pub event_id: String,
    pub unit_name: String,
    pub unit_price_minor: i64,
    pub total_capacity: i32,
    pub reserved: i32,
    pub confirmed: i32,
}

impl CatalogUnit {
    pub fn available(&self) -> i32 {
        self.total_capacity - self.reserved - self.confirmed
    }
}
