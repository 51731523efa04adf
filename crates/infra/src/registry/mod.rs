//! Warehouse and sparepart registries.
//!
//! The stock engine only asks them whether an id exists; the HTTP surface
//! also registers and lists records through them.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryRegistry;
pub use postgres::PostgresRegistry;
pub use r#trait::{RegistryError, SparepartRegistry, WarehouseRegistry};
