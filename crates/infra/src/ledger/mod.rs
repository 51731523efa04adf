//! Ledger storage boundary.
//!
//! A ledger store persists balances and the movement log for every
//! (warehouse, sparepart) pair. Mutations go through a [`LedgerUnit`]: an
//! all-or-nothing unit of work that holds the exclusive lock on one pair from
//! the locking read until commit or rollback.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use r#trait::{LedgerStore, LedgerStoreError, LedgerUnit, MovementFilter, PairSnapshot};
