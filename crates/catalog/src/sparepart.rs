use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use partstock_core::{DomainResult, Entity, SparepartId};

use crate::{CatalogEntry, validate};

pub const NAME_MIN_LENGTH: usize = 3;
pub const NAME_MAX_LENGTH: usize = 200;
pub const SKU_MIN_LENGTH: usize = 2;
pub const SKU_MAX_LENGTH: usize = 50;

/// A stockable spare part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sparepart {
    pub id: SparepartId,
    pub name: String,
    pub sku: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Sparepart {
    type Id = SparepartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl CatalogEntry for Sparepart {
    const KIND: &'static str = "Sparepart";
    const KEY_LABEL: &'static str = "SKU";

    fn natural_key(&self) -> &str {
        &self.sku
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Validated input for registering a spare part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSparepart {
    name: String,
    sku: String,
}

impl NewSparepart {
    pub fn new(name: &str, sku: &str) -> DomainResult<Self> {
        Ok(Self {
            name: validate::name("Sparepart name", name, NAME_MIN_LENGTH, NAME_MAX_LENGTH)?,
            sku: validate::code("Sparepart SKU", sku, SKU_MIN_LENGTH, SKU_MAX_LENGTH)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn into_sparepart(self, id: SparepartId, created_at: DateTime<Utc>) -> Sparepart {
        Sparepart {
            id,
            name: self.name,
            sku: self.sku,
            created_at,
            updated_at: created_at,
        }
    }
}
