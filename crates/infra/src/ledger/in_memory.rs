use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use partstock_stock::{Balance, Movement, StockPair};

use super::r#trait::{LedgerStore, LedgerStoreError, LedgerUnit, MovementFilter, PairSnapshot};

#[derive(Debug, Default)]
struct Shared {
    /// One async mutex per pair. Slots are created on first use and never removed.
    locks: DashMap<StockPair, Arc<Mutex<()>>>,
    balances: DashMap<StockPair, Balance>,
    /// Committed movements in commit order.
    log: RwLock<Vec<Movement>>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. Pairs are serialized by a sharded map of async
/// mutexes, so units on different pairs never wait on each other.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    shared: Arc<Shared>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> LedgerStoreError {
    LedgerStoreError::Backend("movement log lock poisoned".to_string())
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerUnit>, LedgerStoreError> {
        Ok(Box::new(InMemoryUnit {
            shared: Arc::clone(&self.shared),
            held: None,
            staged_balance: None,
            staged_movements: Vec::new(),
        }))
    }

    async fn find_balance(&self, pair: StockPair) -> Result<Option<Balance>, LedgerStoreError> {
        Ok(self.shared.balances.get(&pair).map(|b| b.value().clone()))
    }

    async fn movements(&self, filter: &MovementFilter) -> Result<Vec<Movement>, LedgerStoreError> {
        let log = self.shared.log.read().map_err(|_| poisoned())?;
        Ok(log.iter().rev().filter(|m| filter.matches(m)).cloned().collect())
    }

    async fn pair_snapshot(&self, pair: StockPair) -> Result<PairSnapshot, LedgerStoreError> {
        // Commits publish the balance while holding the log's write lock, so
        // holding the read lock here sees both or neither.
        let log = self.shared.log.read().map_err(|_| poisoned())?;
        let balance = self.shared.balances.get(&pair).map(|b| b.value().clone());
        let filter = MovementFilter::for_pair(pair);
        let movements = log.iter().rev().filter(|m| filter.matches(m)).cloned().collect();
        Ok(PairSnapshot { balance, movements })
    }
}

struct HeldPair {
    pair: StockPair,
    _guard: OwnedMutexGuard<()>,
}

struct InMemoryUnit {
    shared: Arc<Shared>,
    held: Option<HeldPair>,
    staged_balance: Option<Balance>,
    staged_movements: Vec<Movement>,
}

impl InMemoryUnit {
    fn ensure_held(&self, pair: StockPair) -> Result<(), LedgerStoreError> {
        match &self.held {
            Some(held) if held.pair == pair => Ok(()),
            Some(held) => Err(LedgerStoreError::InvalidUnit(format!(
                "unit holds {} and cannot touch {pair}",
                held.pair
            ))),
            None => Err(LedgerStoreError::InvalidUnit(format!(
                "{pair} must be locked before it is written"
            ))),
        }
    }

    fn current(&self, pair: StockPair) -> Option<Balance> {
        self.staged_balance
            .clone()
            .or_else(|| self.shared.balances.get(&pair).map(|b| b.value().clone()))
    }
}

#[async_trait]
impl LedgerUnit for InMemoryUnit {
    async fn lock_balance(&mut self, pair: StockPair) -> Result<Option<Balance>, LedgerStoreError> {
        if self.held.is_some() {
            self.ensure_held(pair)?;
            return Ok(self.current(pair));
        }

        // Clone the slot out first: the map shard must not stay borrowed across the await.
        let slot = self.shared.locks.entry(pair).or_default().clone();
        let guard = slot.lock_owned().await;
        self.held = Some(HeldPair {
            pair,
            _guard: guard,
        });
        Ok(self.current(pair))
    }

    async fn lock_or_open_balance(
        &mut self,
        pair: StockPair,
        at: DateTime<Utc>,
    ) -> Result<Balance, LedgerStoreError> {
        if let Some(existing) = self.lock_balance(pair).await? {
            return Ok(existing);
        }
        let opened = Balance::open(pair, at);
        self.staged_balance = Some(opened.clone());
        Ok(opened)
    }

    async fn write_balance(&mut self, balance: &Balance) -> Result<(), LedgerStoreError> {
        self.ensure_held(balance.pair())?;
        self.staged_balance = Some(balance.clone());
        Ok(())
    }

    async fn append_movement(&mut self, movement: &Movement) -> Result<(), LedgerStoreError> {
        self.ensure_held(movement.pair())?;
        self.staged_movements.push(movement.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerStoreError> {
        let InMemoryUnit {
            shared,
            held,
            staged_balance,
            staged_movements,
        } = *self;

        let Some(held) = held else {
            return Ok(());
        };

        {
            let mut log = shared.log.write().map_err(|_| poisoned())?;
            if let Some(balance) = staged_balance {
                shared.balances.insert(held.pair, balance);
            }
            log.extend(staged_movements);
        }

        drop(held);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerStoreError> {
        Ok(())
    }
}
