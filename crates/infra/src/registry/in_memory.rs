use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use partstock_catalog::{CatalogEntry, NewSparepart, NewWarehouse, Sparepart, Warehouse};
use partstock_core::{DomainError, SparepartId, WarehouseId};

use super::r#trait::{RegistryError, SparepartRegistry, WarehouseRegistry};

/// In-memory registry keyed by record id.
///
/// Intended for tests/dev.
#[derive(Debug)]
pub struct InMemoryRegistry<E: CatalogEntry> {
    entries: RwLock<HashMap<E::Id, E>>,
}

impl<E: CatalogEntry> Default for InMemoryRegistry<E> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<E> InMemoryRegistry<E>
where
    E: CatalogEntry + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> RegistryError {
        RegistryError::Backend(format!("{} registry lock poisoned", E::KIND))
    }

    fn contains(&self, id: &E::Id) -> Result<bool, RegistryError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.contains_key(id))
    }

    fn get(&self, id: &E::Id) -> Result<Option<E>, RegistryError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.get(id).cloned())
    }

    fn newest_first(&self) -> Result<Vec<E>, RegistryError> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        let mut all: Vec<E> = entries.values().cloned().collect();
        all.sort_by_key(|e| std::cmp::Reverse(e.created_at()));
        Ok(all)
    }

    /// Insert unless another entry already uses the same natural key.
    fn insert_unique(&self, entry: E) -> Result<E, RegistryError> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        if entries
            .values()
            .any(|e| e.natural_key() == entry.natural_key())
        {
            return Err(DomainError::conflict(format!(
                "{} with {} {} already exists",
                E::KIND,
                E::KEY_LABEL,
                entry.natural_key()
            ))
            .into());
        }
        entries.insert(*entry.id(), entry.clone());
        Ok(entry)
    }
}

#[async_trait]
impl WarehouseRegistry for InMemoryRegistry<Warehouse> {
    async fn warehouse_exists(&self, id: WarehouseId) -> Result<bool, RegistryError> {
        self.contains(&id)
    }

    async fn get_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, RegistryError> {
        self.get(&id)
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, RegistryError> {
        self.newest_first()
    }

    async fn register_warehouse(&self, new: NewWarehouse) -> Result<Warehouse, RegistryError> {
        self.insert_unique(new.into_warehouse(WarehouseId::new(), Utc::now()))
    }
}

#[async_trait]
impl SparepartRegistry for InMemoryRegistry<Sparepart> {
    async fn sparepart_exists(&self, id: SparepartId) -> Result<bool, RegistryError> {
        self.contains(&id)
    }

    async fn get_sparepart(&self, id: SparepartId) -> Result<Option<Sparepart>, RegistryError> {
        self.get(&id)
    }

    async fn list_spareparts(&self) -> Result<Vec<Sparepart>, RegistryError> {
        self.newest_first()
    }

    async fn register_sparepart(&self, new: NewSparepart) -> Result<Sparepart, RegistryError> {
        self.insert_unique(new.into_sparepart(SparepartId::new(), Utc::now()))
    }
}
