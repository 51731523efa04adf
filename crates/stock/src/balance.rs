use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partstock_core::{BalanceId, Entity, SparepartId, WarehouseId};

use crate::error::StockError;
use crate::movement::MovementKind;
use crate::pair::StockPair;
use crate::quantity::Quantity;

/// Materialized quantity on hand for one (warehouse, part) pair.
///
/// `current_stock` is unsigned, so a negative balance is unrepresentable; the
/// transitions below are the only way a balance changes value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub id: BalanceId,
    pub warehouse_id: WarehouseId,
    pub sparepart_id: SparepartId,
    pub current_stock: u64,
    pub updated_at: DateTime<Utc>,
}

impl Balance {
    /// A fresh zero balance for a pair that has none yet.
    pub fn open(pair: StockPair, at: DateTime<Utc>) -> Self {
        Self {
            id: BalanceId::new(),
            warehouse_id: pair.warehouse_id,
            sparepart_id: pair.sparepart_id,
            current_stock: 0,
            updated_at: at,
        }
    }

    pub fn pair(&self) -> StockPair {
        StockPair::new(self.warehouse_id, self.sparepart_id)
    }

    pub fn credited(&self, quantity: Quantity, at: DateTime<Utc>) -> Result<Balance, StockError> {
        let current_stock = self
            .current_stock
            .checked_add(quantity.get())
            .ok_or_else(|| StockError::invalid_argument("credit would overflow the balance"))?;
        Ok(Balance {
            current_stock,
            updated_at: at,
            ..self.clone()
        })
    }

    /// Debit exactly `quantity`, or nothing. Taking the balance to zero is allowed.
    pub fn debited(&self, quantity: Quantity, at: DateTime<Utc>) -> Result<Balance, StockError> {
        let current_stock = self.current_stock.checked_sub(quantity.get()).ok_or(
            StockError::InsufficientStock {
                available: self.current_stock,
                requested: quantity.get(),
            },
        )?;
        Ok(Balance {
            current_stock,
            updated_at: at,
            ..self.clone()
        })
    }

    pub fn applied(
        &self,
        kind: MovementKind,
        quantity: Quantity,
        at: DateTime<Utc>,
    ) -> Result<Balance, StockError> {
        match kind {
            MovementKind::Credit => self.credited(quantity, at),
            MovementKind::Debit => self.debited(quantity, at),
        }
    }
}

impl Entity for Balance {
    type Id = BalanceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::DEFAULT_MAX_QUANTITY;

    fn qty(n: i64) -> Quantity {
        Quantity::new(n, DEFAULT_MAX_QUANTITY).unwrap()
    }

    fn pair() -> StockPair {
        StockPair::new(WarehouseId::new(), SparepartId::new())
    }

    #[test]
    fn credit_then_debit_to_exact_zero() {
        let now = Utc::now();
        let b = Balance::open(pair(), now).credited(qty(100), now).unwrap();
        let b = b.debited(qty(100), now).unwrap();
        assert_eq!(b.current_stock, 0);
    }

    #[test]
    fn debit_from_zero_reports_zero_available() {
        let now = Utc::now();
        let b = Balance::open(pair(), now);
        assert_eq!(
            b.debited(qty(5), now),
            Err(StockError::InsufficientStock {
                available: 0,
                requested: 5
            })
        );
    }

    #[test]
    fn rejected_debit_leaves_balance_untouched() {
        let now = Utc::now();
        let b = Balance::open(pair(), now).credited(qty(50), now).unwrap();
        let before = b.clone();
        assert!(b.debited(qty(51), now).is_err());
        assert_eq!(b, before);
    }

    #[test]
    fn credit_overflow_is_invalid_argument() {
        let now = Utc::now();
        let mut b = Balance::open(pair(), now);
        b.current_stock = u64::MAX;
        assert!(matches!(
            b.credited(qty(1), now),
            Err(StockError::InvalidArgument(_))
        ));
    }

    #[test]
    fn transitions_keep_identity() {
        let now = Utc::now();
        let b = Balance::open(pair(), now);
        let after = b.credited(qty(3), now).unwrap();
        assert_eq!(after.id, b.id);
        assert_eq!(after.pair(), b.pair());
    }
}
