use std::sync::Arc;

use thiserror::Error;

use partstock_catalog::{Sparepart, Warehouse};
use partstock_infra::config::{AppConfig, StorageConfig};
use partstock_infra::{
    BalanceMutator, InMemoryLedgerStore, InMemoryRegistry, LedgerStore, MutationPolicy,
    PostgresLedgerStore, PostgresRegistry, SparepartRegistry, StockQueryService,
    WarehouseRegistry, db,
};

pub type SharedLedger = Arc<dyn LedgerStore>;
pub type SharedWarehouses = Arc<dyn WarehouseRegistry>;
pub type SharedSpareparts = Arc<dyn SparepartRegistry>;

pub type StockMutator = BalanceMutator<SharedLedger, SharedWarehouses, SharedSpareparts>;
pub type StockQueries = StockQueryService<SharedLedger>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    Postgres,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageBackend::InMemory => "in_memory",
            StorageBackend::Postgres => "postgres",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("failed to connect to postgres: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("failed to apply migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Everything the handlers need, behind trait objects so both backends share
/// one router.
#[derive(Clone)]
pub struct AppServices {
    pub mutator: Arc<StockMutator>,
    pub queries: Arc<StockQueries>,
    pub warehouses: SharedWarehouses,
    pub spareparts: SharedSpareparts,
    pub backend: StorageBackend,
}

impl AppServices {
    fn assemble(
        ledger: SharedLedger,
        warehouses: SharedWarehouses,
        spareparts: SharedSpareparts,
        policy: MutationPolicy,
        backend: StorageBackend,
    ) -> Self {
        let mutator = BalanceMutator::new(
            Arc::clone(&ledger),
            Arc::clone(&warehouses),
            Arc::clone(&spareparts),
            policy,
        );
        Self {
            mutator: Arc::new(mutator),
            queries: Arc::new(StockQueryService::new(ledger)),
            warehouses,
            spareparts,
            backend,
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory(policy: MutationPolicy) -> Self {
        Self::assemble(
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryRegistry::<Warehouse>::new()),
            Arc::new(InMemoryRegistry::<Sparepart>::new()),
            policy,
            StorageBackend::InMemory,
        )
    }

    /// Postgres wiring: connect, migrate, then share one pool across stores.
    pub async fn postgres(
        db_config: &partstock_infra::DatabaseConfig,
        policy: MutationPolicy,
    ) -> Result<Self, ServicesError> {
        let pool = db::connect(db_config).await?;
        db::migrate(&pool).await?;

        let registry = Arc::new(PostgresRegistry::new(pool.clone()));
        Ok(Self::assemble(
            Arc::new(PostgresLedgerStore::new(pool, policy.lock_timeout)),
            registry.clone(),
            registry,
            policy,
            StorageBackend::Postgres,
        ))
    }
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, ServicesError> {
    match &config.storage {
        StorageConfig::InMemory => {
            tracing::info!("using in-memory stores");
            Ok(AppServices::in_memory(config.policy))
        }
        StorageConfig::Postgres(db_config) => {
            tracing::info!("using postgres stores");
            AppServices::postgres(db_config, config.policy).await
        }
    }
}
