use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partstock_core::{DomainResult, Entity, WarehouseId};

use crate::{CatalogEntry, validate};

pub const NAME_MIN_LENGTH: usize = 3;
pub const NAME_MAX_LENGTH: usize = 100;
pub const CODE_MIN_LENGTH: usize = 2;
pub const CODE_MAX_LENGTH: usize = 20;

/// A stocking location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Warehouse {
    type Id = WarehouseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl CatalogEntry for Warehouse {
    const KIND: &'static str = "Warehouse";
    const KEY_LABEL: &'static str = "code";

    fn natural_key(&self) -> &str {
        &self.code
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Validated input for registering a warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWarehouse {
    name: String,
    code: String,
}

impl NewWarehouse {
    pub fn new(name: &str, code: &str) -> DomainResult<Self> {
        Ok(Self {
            name: validate::name("Warehouse name", name, NAME_MIN_LENGTH, NAME_MAX_LENGTH)?,
            code: validate::code("Warehouse code", code, CODE_MIN_LENGTH, CODE_MAX_LENGTH)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn into_warehouse(self, id: WarehouseId, created_at: DateTime<Utc>) -> Warehouse {
        Warehouse {
            id,
            name: self.name,
            code: self.code,
            created_at,
        }
    }
}
