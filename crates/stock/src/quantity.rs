use serde::{Deserialize, Serialize};

use partstock_core::ValueObject;

use crate::error::StockError;

pub const MIN_QUANTITY: u64 = 1;

/// Default per-movement ceiling; the engine's ceiling is configurable.
pub const DEFAULT_MAX_QUANTITY: u64 = 999_999;

/// A strictly positive movement quantity, already checked against a ceiling.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u64);

impl Quantity {
    /// Validate a raw requested quantity against `[MIN_QUANTITY, ceiling]`.
    pub fn new(raw: i64, ceiling: u64) -> Result<Self, StockError> {
        if raw < MIN_QUANTITY as i64 {
            return Err(StockError::invalid_argument("Quantity must be greater than 0"));
        }
        let value = raw as u64;
        if value > ceiling {
            return Err(StockError::invalid_argument(format!(
                "Quantity must not exceed {ceiling}"
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl ValueObject for Quantity {}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
