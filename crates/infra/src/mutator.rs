//! Balance mutator: the only writer of balances and movements.
//!
//! Every credit or debit runs as one unit of work on one (warehouse, sparepart)
//! pair:
//!
//! 1. Precheck: warehouse exists, sparepart exists, quantity is in range
//!    (in that order; the first failure wins).
//! 2. Locking read of the pair's balance. Credits create a zero balance when
//!    none exists; debits fail with `NotFound` instead.
//! 3. Apply the domain transition (`Balance::credited` / `Balance::debited`).
//! 4. Write the new balance and append exactly one movement.
//! 5. Commit. Any failure before this point rolls everything back.
//!
//! ## Concurrency Safety
//!
//! The pair lock is held from step 2 until commit or rollback, so the value a
//! debit checks is the value it decrements. Units on different pairs never
//! wait on each other. Lock waits are bounded by a deadline; running out of
//! time is reported as `StockError::Retryable` and leaves no trace.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use partstock_core::{SparepartId, WarehouseId};
use partstock_stock::{
    DEFAULT_MAX_QUANTITY, Missing, Movement, MovementKind, Quantity, StockError, StockPair,
    StockResult,
};

use crate::ledger::{LedgerStore, LedgerUnit};
use crate::registry::{SparepartRegistry, WarehouseRegistry};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Limits applied to every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationPolicy {
    /// Largest quantity accepted by a single movement.
    pub max_quantity: u64,
    /// Default deadline for acquiring the pair lock and committing.
    pub lock_timeout: Duration,
}

impl Default for MutationPolicy {
    fn default() -> Self {
        Self {
            max_quantity: DEFAULT_MAX_QUANTITY,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// A request to move `quantity` units into or out of a pair.
///
/// `quantity` is raw caller input; range checks happen in the mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementRequest {
    pub warehouse_id: WarehouseId,
    pub sparepart_id: SparepartId,
    pub quantity: i64,
}

impl MovementRequest {
    pub fn new(warehouse_id: WarehouseId, sparepart_id: SparepartId, quantity: i64) -> Self {
        Self {
            warehouse_id,
            sparepart_id,
            quantity,
        }
    }

    pub fn pair(&self) -> StockPair {
        StockPair::new(self.warehouse_id, self.sparepart_id)
    }
}

/// Credits and debits balances.
///
/// Generic over the ledger store and the two registries so the same engine
/// runs on the in-memory and Postgres backends.
#[derive(Debug, Clone)]
pub struct BalanceMutator<L, W, P> {
    ledger: L,
    warehouses: W,
    spareparts: P,
    policy: MutationPolicy,
}

impl<L, W, P> BalanceMutator<L, W, P>
where
    L: LedgerStore,
    W: WarehouseRegistry,
    P: SparepartRegistry,
{
    pub fn new(ledger: L, warehouses: W, spareparts: P, policy: MutationPolicy) -> Self {
        Self {
            ledger,
            warehouses,
            spareparts,
            policy,
        }
    }

    /// Increase the pair's balance, creating it at zero first if needed.
    pub async fn credit(&self, request: MovementRequest) -> StockResult<Movement> {
        self.credit_until(request, self.default_deadline()).await
    }

    /// Decrease the pair's balance; never takes it below zero.
    pub async fn debit(&self, request: MovementRequest) -> StockResult<Movement> {
        self.debit_until(request, self.default_deadline()).await
    }

    pub async fn credit_until(
        &self,
        request: MovementRequest,
        deadline: Instant,
    ) -> StockResult<Movement> {
        self.mutate(MovementKind::Credit, request, deadline).await
    }

    pub async fn debit_until(
        &self,
        request: MovementRequest,
        deadline: Instant,
    ) -> StockResult<Movement> {
        self.mutate(MovementKind::Debit, request, deadline).await
    }

    fn default_deadline(&self) -> Instant {
        Instant::now() + self.policy.lock_timeout
    }

    #[instrument(
        skip_all,
        fields(
            kind = %kind,
            warehouse_id = %request.warehouse_id,
            sparepart_id = %request.sparepart_id,
            quantity = request.quantity
        )
    )]
    async fn mutate(
        &self,
        kind: MovementKind,
        request: MovementRequest,
        deadline: Instant,
    ) -> StockResult<Movement> {
        let quantity = self.precheck(&request).await?;
        let pair = request.pair();

        let unit = self.run_unit(kind, pair, quantity);
        let outcome = match tokio::time::timeout_at(deadline, unit).await {
            Ok(result) => result,
            // Dropping the unit's future rolls it back and releases the pair.
            Err(_) => Err(StockError::retryable(format!(
                "deadline elapsed before {kind} on {pair} committed"
            ))),
        };

        match &outcome {
            Ok(movement) => info!(movement_id = %movement.id, "stock movement committed"),
            Err(err @ StockError::InsufficientStock { .. }) => {
                warn!(error = %err, "debit rejected")
            }
            Err(err) if err.is_retryable() => warn!(error = %err, "stock movement not applied"),
            Err(err) => debug!(error = %err, code = err.code(), "stock movement rejected"),
        }
        outcome
    }

    async fn precheck(&self, request: &MovementRequest) -> StockResult<Quantity> {
        if !self.warehouses.warehouse_exists(request.warehouse_id).await? {
            return Err(StockError::NotFound(Missing::Warehouse(request.warehouse_id)));
        }
        if !self.spareparts.sparepart_exists(request.sparepart_id).await? {
            return Err(StockError::NotFound(Missing::Sparepart(request.sparepart_id)));
        }
        Quantity::new(request.quantity, self.policy.max_quantity)
    }

    async fn run_unit(
        &self,
        kind: MovementKind,
        pair: StockPair,
        quantity: Quantity,
    ) -> StockResult<Movement> {
        let mut unit = self.ledger.begin().await?;

        match apply_in_unit(unit.as_mut(), kind, pair, quantity).await {
            Ok(movement) => {
                unit.commit().await?;
                Ok(movement)
            }
            Err(err) => {
                if let Err(rollback_err) = unit.rollback().await {
                    warn!(error = %rollback_err, "rollback failed; unit discarded");
                }
                Err(err)
            }
        }
    }
}

async fn apply_in_unit(
    unit: &mut dyn LedgerUnit,
    kind: MovementKind,
    pair: StockPair,
    quantity: Quantity,
) -> StockResult<Movement> {
    let current = match kind {
        MovementKind::Credit => unit.lock_or_open_balance(pair, Utc::now()).await?,
        MovementKind::Debit => unit
            .lock_balance(pair)
            .await?
            .ok_or(StockError::NotFound(Missing::Stock(pair)))?,
    };
    debug!(current_stock = current.current_stock, "pair locked");

    // Stamped after the lock so timestamps follow the commit order of the pair.
    let now = Utc::now();
    let next = current.applied(kind, quantity, now)?;
    let movement = Movement::record(pair, kind, quantity, now);

    unit.write_balance(&next).await?;
    unit.append_movement(&movement).await?;
    Ok(movement)
}
