use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use partstock_catalog::{NewSparepart, NewWarehouse, Sparepart, Warehouse};
use partstock_core::{DomainError, SparepartId, WarehouseId};
use partstock_stock::StockError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Validation failure or duplicate natural key.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Pool exhaustion, dropped connection, lock contention. Safe to retry.
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("registry backend error: {0}")]
    Backend(String),
}

impl RegistryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::Unavailable(_))
    }
}

impl From<RegistryError> for StockError {
    fn from(err: RegistryError) -> Self {
        if err.is_retryable() {
            StockError::retryable(err.to_string())
        } else {
            StockError::storage(err.to_string())
        }
    }
}

#[async_trait]
pub trait WarehouseRegistry: Send + Sync {
    async fn warehouse_exists(&self, id: WarehouseId) -> Result<bool, RegistryError>;

    async fn get_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, RegistryError>;

    /// Newest first.
    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, RegistryError>;

    /// Fails with `DomainError::Conflict` when the code is taken.
    async fn register_warehouse(&self, new: NewWarehouse) -> Result<Warehouse, RegistryError>;
}

#[async_trait]
pub trait SparepartRegistry: Send + Sync {
    async fn sparepart_exists(&self, id: SparepartId) -> Result<bool, RegistryError>;

    async fn get_sparepart(&self, id: SparepartId) -> Result<Option<Sparepart>, RegistryError>;

    /// Newest first.
    async fn list_spareparts(&self) -> Result<Vec<Sparepart>, RegistryError>;

    /// Fails with `DomainError::Conflict` when the SKU is taken.
    async fn register_sparepart(&self, new: NewSparepart) -> Result<Sparepart, RegistryError>;
}

#[async_trait]
impl<R> WarehouseRegistry for Arc<R>
where
    R: WarehouseRegistry + ?Sized,
{
    async fn warehouse_exists(&self, id: WarehouseId) -> Result<bool, RegistryError> {
        (**self).warehouse_exists(id).await
    }

    async fn get_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, RegistryError> {
        (**self).get_warehouse(id).await
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, RegistryError> {
        (**self).list_warehouses().await
    }

    async fn register_warehouse(&self, new: NewWarehouse) -> Result<Warehouse, RegistryError> {
        (**self).register_warehouse(new).await
    }
}

#[async_trait]
impl<R> SparepartRegistry for Arc<R>
where
    R: SparepartRegistry + ?Sized,
{
    async fn sparepart_exists(&self, id: SparepartId) -> Result<bool, RegistryError> {
        (**self).sparepart_exists(id).await
    }

    async fn get_sparepart(&self, id: SparepartId) -> Result<Option<Sparepart>, RegistryError> {
        (**self).get_sparepart(id).await
    }

    async fn list_spareparts(&self) -> Result<Vec<Sparepart>, RegistryError> {
        (**self).list_spareparts().await
    }

    async fn register_sparepart(&self, new: NewSparepart) -> Result<Sparepart, RegistryError> {
        (**self).register_sparepart(new).await
    }
}
