use serde::{Deserialize, Serialize};

use partstock_core::{SparepartId, ValueObject, WarehouseId};

/// The (warehouse, part) key identifying one balance and its slice of the ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockPair {
    pub warehouse_id: WarehouseId,
    pub sparepart_id: SparepartId,
}

impl StockPair {
    pub fn new(warehouse_id: WarehouseId, sparepart_id: SparepartId) -> Self {
        Self {
            warehouse_id,
            sparepart_id,
        }
    }
}

impl ValueObject for StockPair {}

impl core::fmt::Display for StockPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "warehouse {} and sparepart {}",
            self.warehouse_id, self.sparepart_id
        )
    }
}
