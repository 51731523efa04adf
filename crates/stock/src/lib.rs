//! Stock ledger domain module.
//!
//! This crate contains the rules for balances and movements, implemented purely
//! as deterministic domain logic (no IO, no locking, no storage). The
//! transactional engine in `partstock-infra` drives these types inside a unit of
//! work; everything here is safe to call from tests without a runtime.

pub mod balance;
pub mod error;
pub mod ledger;
pub mod movement;
pub mod pair;
pub mod quantity;

pub use balance::Balance;
pub use error::{Missing, StockError, StockResult};
pub use ledger::{LedgerTotals, Reconciliation};
pub use movement::{Movement, MovementKind};
pub use pair::StockPair;
pub use quantity::{DEFAULT_MAX_QUANTITY, MIN_QUANTITY, Quantity};
