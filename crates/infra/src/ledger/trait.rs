use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use partstock_core::{SparepartId, WarehouseId};
use partstock_stock::{Balance, Movement, StockError, StockPair};

/// Optional history filters. Both `None` means the whole log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementFilter {
    pub warehouse_id: Option<WarehouseId>,
    pub sparepart_id: Option<SparepartId>,
}

impl MovementFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_pair(pair: StockPair) -> Self {
        Self {
            warehouse_id: Some(pair.warehouse_id),
            sparepart_id: Some(pair.sparepart_id),
        }
    }

    pub fn matches(&self, movement: &Movement) -> bool {
        self.warehouse_id.is_none_or(|w| w == movement.warehouse_id)
            && self.sparepart_id.is_none_or(|p| p == movement.sparepart_id)
    }
}

/// Balance and movements of one pair, read from a single consistent view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSnapshot {
    pub balance: Option<Balance>,
    /// Newest first.
    pub movements: Vec<Movement>,
}

/// Storage-level failure of a ledger operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerStoreError {
    /// Lock wait timeout, deadlock or serialization failure.
    #[error("lock contention: {0}")]
    Contention(String),

    /// The backend could not be reached (pool exhausted, connection lost).
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The unit of work was used outside its contract (e.g. touching a second pair).
    #[error("invalid unit of work: {0}")]
    InvalidUnit(String),

    #[error("ledger backend error: {0}")]
    Backend(String),
}

impl LedgerStoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerStoreError::Contention(_) | LedgerStoreError::Unavailable(_)
        )
    }
}

impl From<LedgerStoreError> for StockError {
    fn from(err: LedgerStoreError) -> Self {
        if err.is_retryable() {
            StockError::retryable(err.to_string())
        } else {
            StockError::storage(err.to_string())
        }
    }
}

/// One atomic unit of work over a single pair.
///
/// The first locking read acquires the pair's exclusive lock; it is held until
/// `commit` or `rollback`. Dropping a unit without committing rolls it back.
#[async_trait]
pub trait LedgerUnit: Send {
    /// Locking read of the pair's balance. `None` when no balance exists yet.
    async fn lock_balance(&mut self, pair: StockPair) -> Result<Option<Balance>, LedgerStoreError>;

    /// Locking read that creates a zero balance first when none exists.
    ///
    /// Concurrent first credits on the same pair end up with exactly one balance.
    async fn lock_or_open_balance(
        &mut self,
        pair: StockPair,
        at: DateTime<Utc>,
    ) -> Result<Balance, LedgerStoreError>;

    /// Overwrite the locked balance with a new value.
    async fn write_balance(&mut self, balance: &Balance) -> Result<(), LedgerStoreError>;

    /// Append one immutable movement for the locked pair.
    async fn append_movement(&mut self, movement: &Movement) -> Result<(), LedgerStoreError>;

    /// Make every staged change visible at once and release the lock.
    async fn commit(self: Box<Self>) -> Result<(), LedgerStoreError>;

    /// Discard every staged change and release the lock.
    async fn rollback(self: Box<Self>) -> Result<(), LedgerStoreError>;
}

/// Ledger store.
///
/// Reads on the store itself are non-locking and only ever observe committed
/// state.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerUnit>, LedgerStoreError>;

    async fn find_balance(&self, pair: StockPair) -> Result<Option<Balance>, LedgerStoreError>;

    /// Movements matching `filter`, newest first.
    async fn movements(&self, filter: &MovementFilter) -> Result<Vec<Movement>, LedgerStoreError>;

    async fn pair_snapshot(&self, pair: StockPair) -> Result<PairSnapshot, LedgerStoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn LedgerUnit>, LedgerStoreError> {
        (**self).begin().await
    }

    async fn find_balance(&self, pair: StockPair) -> Result<Option<Balance>, LedgerStoreError> {
        (**self).find_balance(pair).await
    }

    async fn movements(&self, filter: &MovementFilter) -> Result<Vec<Movement>, LedgerStoreError> {
        (**self).movements(filter).await
    }

    async fn pair_snapshot(&self, pair: StockPair) -> Result<PairSnapshot, LedgerStoreError> {
        (**self).pair_snapshot(pair).await
    }
}
