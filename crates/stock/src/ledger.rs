//! Ledger arithmetic: the stored balance is a cache of these sums.

use serde::{Deserialize, Serialize};

use crate::movement::{Movement, MovementKind};
use crate::pair::StockPair;

/// Credit and debit totals over a set of movements.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTotals {
    pub total_credit: u64,
    pub total_debit: u64,
}

impl LedgerTotals {
    /// Sum the movements that belong to `pair`; others are skipped.
    pub fn for_pair<'a>(
        pair: StockPair,
        movements: impl IntoIterator<Item = &'a Movement>,
    ) -> Self {
        movements
            .into_iter()
            .filter(|m| m.pair() == pair)
            .fold(Self::default(), |mut acc, m| {
                match m.kind {
                    MovementKind::Credit => {
                        acc.total_credit = acc.total_credit.saturating_add(m.quantity)
                    }
                    MovementKind::Debit => {
                        acc.total_debit = acc.total_debit.saturating_add(m.quantity)
                    }
                }
                acc
            })
    }

    /// `total_credit - total_debit`; negative only if the ledger is corrupt.
    pub fn net(&self) -> i128 {
        self.total_credit as i128 - self.total_debit as i128
    }
}

/// Stored balance compared against the ledger sum for one pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub pair: StockPair,
    /// Stored `current_stock`, or 0 when the pair has no balance row.
    pub stored_stock: u64,
    #[serde(flatten)]
    pub totals: LedgerTotals,
    pub consistent: bool,
}

impl Reconciliation {
    pub fn new(pair: StockPair, stored_stock: u64, totals: LedgerTotals) -> Self {
        Self {
            pair,
            stored_stock,
            totals,
            consistent: totals.net() == stored_stock as i128,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::Balance;
    use crate::error::StockError;
    use crate::quantity::{DEFAULT_MAX_QUANTITY, Quantity};
    use chrono::Utc;
    use partstock_core::{SparepartId, WarehouseId};
    use proptest::prelude::*;

    fn pair() -> StockPair {
        StockPair::new(WarehouseId::new(), SparepartId::new())
    }

    #[test]
    fn totals_ignore_other_pairs() {
        let a = pair();
        let b = pair();
        let now = Utc::now();
        let q = Quantity::new(10, DEFAULT_MAX_QUANTITY).unwrap();
        let ledger = vec![
            Movement::record(a, MovementKind::Credit, q, now),
            Movement::record(b, MovementKind::Credit, q, now),
            Movement::record(a, MovementKind::Debit, q, now),
        ];
        let totals = LedgerTotals::for_pair(a, &ledger);
        assert_eq!(totals.total_credit, 10);
        assert_eq!(totals.total_debit, 10);
        assert_eq!(totals.net(), 0);
    }

    #[test]
    fn reconciliation_flags_drift() {
        let totals = LedgerTotals {
            total_credit: 70,
            total_debit: 30,
        };
        assert!(Reconciliation::new(pair(), 40, totals).consistent);
        assert!(!Reconciliation::new(pair(), 41, totals).consistent);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: applying any sequence of credits and debits sequentially never
        /// drives the balance negative, and the balance always equals the sum of
        /// the accepted movements.
        #[test]
        fn balance_always_reconciles_with_accepted_movements(
            ops in prop::collection::vec((any::<bool>(), 1i64..500i64), 1..60)
        ) {
            let p = pair();
            let now = Utc::now();
            let mut balance = Balance::open(p, now);
            let mut ledger: Vec<Movement> = Vec::new();

            for (is_credit, raw) in ops {
                let kind = if is_credit { MovementKind::Credit } else { MovementKind::Debit };
                let q = Quantity::new(raw, DEFAULT_MAX_QUANTITY).unwrap();
                match balance.applied(kind, q, now) {
                    Ok(next) => {
                        balance = next;
                        ledger.push(Movement::record(p, kind, q, now));
                    }
                    Err(StockError::InsufficientStock { available, requested }) => {
                        prop_assert_eq!(available, balance.current_stock);
                        prop_assert!(requested > available);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                }

                let totals = LedgerTotals::for_pair(p, &ledger);
                prop_assert_eq!(totals.net(), balance.current_stock as i128);
            }
        }

        /// Property: for uniform debits of size q against stock s, exactly s / q succeed.
        #[test]
        fn uniform_debits_accept_floor_of_stock_over_quantity(
            s in 0i64..2_000i64,
            q in 1i64..200i64,
            attempts in 0usize..40usize,
        ) {
            let p = pair();
            let now = Utc::now();
            let mut balance = Balance::open(p, now);
            if s > 0 {
                let seed = Quantity::new(s, DEFAULT_MAX_QUANTITY).unwrap();
                balance = balance.credited(seed, now).unwrap();
            }
            let quantity = Quantity::new(q, DEFAULT_MAX_QUANTITY).unwrap();

            let mut accepted = 0usize;
            for _ in 0..attempts {
                if let Ok(next) = balance.debited(quantity, now) {
                    balance = next;
                    accepted += 1;
                }
            }

            let expected = attempts.min((s / q) as usize);
            prop_assert_eq!(accepted, expected);
        }
    }
}
