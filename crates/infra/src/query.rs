//! Read side of the ledger: balances, history and reconciliation.
//!
//! Nothing here takes a pair lock; reads only ever see committed state and
//! never block mutations.

use tracing::instrument;

use partstock_stock::{
    Balance, LedgerTotals, Missing, Movement, Reconciliation, StockError, StockPair, StockResult,
};

use crate::ledger::{LedgerStore, MovementFilter};

#[derive(Debug, Clone)]
pub struct StockQueryService<L> {
    ledger: L,
}

impl<L: LedgerStore> StockQueryService<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Current balance of a pair. A pair that was never credited is `NotFound`,
    /// not a zero balance.
    #[instrument(skip(self), fields(pair = %pair))]
    pub async fn get_balance(&self, pair: StockPair) -> StockResult<Balance> {
        self.ledger
            .find_balance(pair)
            .await?
            .ok_or(StockError::NotFound(Missing::Stock(pair)))
    }

    /// Movements matching the filter, newest first.
    #[instrument(skip(self))]
    pub async fn get_history(&self, filter: MovementFilter) -> StockResult<Vec<Movement>> {
        Ok(self.ledger.movements(&filter).await?)
    }

    /// Compare a pair's stored balance with the sum of its movements.
    ///
    /// A pair with no balance and no movements reconciles at zero.
    #[instrument(skip(self), fields(pair = %pair))]
    pub async fn reconcile(&self, pair: StockPair) -> StockResult<Reconciliation> {
        let snapshot = self.ledger.pair_snapshot(pair).await?;
        let stored = snapshot.balance.map(|b| b.current_stock).unwrap_or(0);
        let totals = LedgerTotals::for_pair(pair, &snapshot.movements);
        let report = Reconciliation::new(pair, stored, totals);
        if !report.consistent {
            tracing::error!(
                stored_stock = report.stored_stock,
                net = %report.totals.net(),
                "balance does not match movement log"
            );
        }
        Ok(report)
    }
}
