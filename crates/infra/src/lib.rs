//! Infrastructure layer: ledger storage, registries, the stock engine, config.

pub mod config;
pub mod db;
pub mod ledger;
pub mod mutator;
pub mod query;
pub mod registry;

#[cfg(test)]
mod integration_tests;

pub use config::{AppConfig, ConfigError, DatabaseConfig, StorageConfig};
pub use ledger::{
    InMemoryLedgerStore, LedgerStore, LedgerStoreError, LedgerUnit, MovementFilter,
    PostgresLedgerStore,
};
pub use mutator::{BalanceMutator, MovementRequest, MutationPolicy};
pub use query::StockQueryService;
pub use registry::{
    InMemoryRegistry, PostgresRegistry, RegistryError, SparepartRegistry, WarehouseRegistry,
};
