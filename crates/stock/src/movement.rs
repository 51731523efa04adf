use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partstock_core::{Entity, MovementId, SparepartId, WarehouseId};

use crate::pair::StockPair;
use crate::quantity::Quantity;

/// Direction of a movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    /// Stock-in.
    Credit,
    /// Stock-out.
    Debit,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Credit => "CREDIT",
            MovementKind::Debit => "DEBIT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREDIT" => Some(MovementKind::Credit),
            "DEBIT" => Some(MovementKind::Debit),
            _ => None,
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable ledger record of one credit or debit.
///
/// Written exactly once, in the same unit of work as the balance change it
/// describes; never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: MovementId,
    pub warehouse_id: WarehouseId,
    pub sparepart_id: SparepartId,
    pub kind: MovementKind,
    pub quantity: u64,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    /// Build the record for a movement being applied now.
    pub fn record(
        pair: StockPair,
        kind: MovementKind,
        quantity: Quantity,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            warehouse_id: pair.warehouse_id,
            sparepart_id: pair.sparepart_id,
            kind,
            quantity: quantity.get(),
            created_at: at,
        }
    }

    pub fn pair(&self) -> StockPair {
        StockPair::new(self.warehouse_id, self.sparepart_id)
    }
}

impl Entity for Movement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
