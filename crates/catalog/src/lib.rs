//! Reference registries' records: warehouses and spare parts.
//!
//! This crate contains the validation rules for registry records, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod sparepart;
pub mod validate;
pub mod warehouse;

pub use sparepart::{NewSparepart, Sparepart};
pub use warehouse::{NewWarehouse, Warehouse};

/// A registry record with a human-facing natural key that must be unique
/// (warehouse `code`, sparepart `sku`).
pub trait CatalogEntry: partstock_core::Entity {
    /// Label used in messages ("Warehouse", "Sparepart").
    const KIND: &'static str;

    /// Name of the natural key in messages ("code", "SKU").
    const KEY_LABEL: &'static str;

    fn natural_key(&self) -> &str;

    fn created_at(&self) -> chrono::DateTime<chrono::Utc>;
}
