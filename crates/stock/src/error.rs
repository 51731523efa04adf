//! Stock movement failure taxonomy.

use thiserror::Error;

use partstock_core::{SparepartId, WarehouseId};

use crate::pair::StockPair;

pub type StockResult<T> = Result<T, StockError>;

/// What a `NotFound` refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Missing {
    Warehouse(WarehouseId),
    Sparepart(SparepartId),
    /// No balance row exists for the pair (it has never been credited).
    Stock(StockPair),
}

impl core::fmt::Display for Missing {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Missing::Warehouse(id) => write!(f, "Warehouse with ID {id} not found"),
            Missing::Sparepart(id) => write!(f, "Sparepart with ID {id} not found"),
            Missing::Stock(pair) => write!(f, "Stock not found for {pair}"),
        }
    }
}

/// Typed failure of a credit, debit or balance lookup.
///
/// Every failure of a unit of work maps onto one of these, and every one of them
/// implies the unit was rolled back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("{0}")]
    NotFound(Missing),

    /// Non-positive or out-of-range quantity, or a credit that would overflow.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Insufficient stock. Available: {available}, Requested: {requested}")]
    InsufficientStock { available: u64, requested: u64 },

    /// Transient contention (lock wait timeout, deadlock, serialization failure,
    /// deadline elapsed). Safe for the caller to retry.
    #[error("retryable: {0}")]
    Retryable(String),

    /// Non-transient storage failure.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl StockError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn retryable(msg: impl Into<String>) -> Self {
        Self::Retryable(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StockError::Retryable(_))
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            StockError::NotFound(Missing::Warehouse(_)) => "warehouse_not_found",
            StockError::NotFound(Missing::Sparepart(_)) => "sparepart_not_found",
            StockError::NotFound(Missing::Stock(_)) => "stock_not_found",
            StockError::InvalidArgument(_) => "invalid_argument",
            StockError::InsufficientStock { .. } => "insufficient_stock",
            StockError::Retryable(_) => "retryable",
            StockError::Storage(_) => "storage_error",
        }
    }
}
