use serde::Deserialize;

use partstock_core::{SparepartId, WarehouseId};
use partstock_infra::{MovementFilter, MovementRequest};
use partstock_stock::StockPair;

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateWarehouseRequest {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSparepartRequest {
    pub name: String,
    pub sku: String,
}

/// Body of `POST /stock/in` and `POST /stock/out`.
///
/// Ids arrive as strings so a malformed one gets a field-specific message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementBody {
    pub warehouse_id: String,
    pub sparepart_id: String,
    pub quantity: i64,
}

impl StockMovementBody {
    pub fn into_request(self) -> Result<MovementRequest, axum::response::Response> {
        Ok(MovementRequest::new(
            errors::parse_id::<WarehouseId>("warehouseId", &self.warehouse_id)?,
            errors::parse_id::<SparepartId>("sparepartId", &self.sparepart_id)?,
            self.quantity,
        ))
    }
}

/// `?warehouseId=&sparepartId=` on the stock read endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairQuery {
    pub warehouse_id: Option<String>,
    pub sparepart_id: Option<String>,
}

impl PairQuery {
    /// Both ids required.
    pub fn pair(&self) -> Result<StockPair, axum::response::Response> {
        Ok(StockPair::new(
            errors::require_id("warehouseId", self.warehouse_id.as_deref())?,
            errors::require_id("sparepartId", self.sparepart_id.as_deref())?,
        ))
    }

    /// Either id may be omitted (or blank) to widen the filter.
    pub fn filter(&self) -> Result<MovementFilter, axum::response::Response> {
        Ok(MovementFilter {
            warehouse_id: errors::optional_id("warehouseId", self.warehouse_id.as_deref())?,
            sparepart_id: errors::optional_id("sparepartId", self.sparepart_id.as_deref())?,
        })
    }
}
