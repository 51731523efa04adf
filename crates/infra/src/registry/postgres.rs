use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use partstock_catalog::{NewSparepart, NewWarehouse, Sparepart, Warehouse};
use partstock_core::{DomainError, SparepartId, WarehouseId};

use super::r#trait::{RegistryError, SparepartRegistry, WarehouseRegistry};

/// Postgres-backed warehouse and sparepart registries.
///
/// Shares its tables with [`crate::ledger::PostgresLedgerStore`]: balances and
/// movements reference `warehouses` and `spareparts` by foreign key.
#[derive(Debug, Clone)]
pub struct PostgresRegistry {
    pool: Arc<PgPool>,
}

impl PostgresRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> RegistryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // deadlock, serialization failure, lock_timeout, canceled wait
                Some("40P01" | "40001" | "55P03" | "57014") => RegistryError::Unavailable(msg),
                _ => RegistryError::Backend(msg),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            RegistryError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => RegistryError::Unavailable(format!("io error in {operation}: {e}")),
        _ => RegistryError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

#[async_trait]
impl WarehouseRegistry for PostgresRegistry {
    #[instrument(skip(self), fields(warehouse_id = %id), err)]
    async fn warehouse_exists(&self, id: WarehouseId) -> Result<bool, RegistryError> {
        sqlx::query("SELECT EXISTS (SELECT 1 FROM warehouses WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .and_then(|row| row.try_get::<bool, _>(0))
            .map_err(|e| map_sqlx_error("warehouse_exists", e))
    }

    #[instrument(skip(self), fields(warehouse_id = %id), err)]
    async fn get_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, RegistryError> {
        let row = sqlx::query("SELECT id, name, code, created_at FROM warehouses WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_warehouse", e))?;

        row.map(|r| WarehouseRow::from_row(&r).map(Warehouse::from))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_warehouse", e))
    }

    #[instrument(skip(self), err)]
    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, RegistryError> {
        let rows = sqlx::query(
            "SELECT id, name, code, created_at FROM warehouses ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_warehouses", e))?;

        rows.iter()
            .map(|r| WarehouseRow::from_row(r).map(Warehouse::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_warehouse", e))
    }

    #[instrument(skip(self, new), fields(code = new.code()), err)]
    async fn register_warehouse(&self, new: NewWarehouse) -> Result<Warehouse, RegistryError> {
        let warehouse = new.into_warehouse(WarehouseId::new(), Utc::now());

        sqlx::query("INSERT INTO warehouses (id, name, code, created_at) VALUES ($1, $2, $3, $4)")
            .bind(warehouse.id.as_uuid())
            .bind(&warehouse.name)
            .bind(&warehouse.code)
            .bind(warehouse.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::conflict(format!(
                        "Warehouse with code {} already exists",
                        warehouse.code
                    ))
                    .into()
                } else {
                    map_sqlx_error("register_warehouse", e)
                }
            })?;

        Ok(warehouse)
    }
}

#[async_trait]
impl SparepartRegistry for PostgresRegistry {
    #[instrument(skip(self), fields(sparepart_id = %id), err)]
    async fn sparepart_exists(&self, id: SparepartId) -> Result<bool, RegistryError> {
        sqlx::query("SELECT EXISTS (SELECT 1 FROM spareparts WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .and_then(|row| row.try_get::<bool, _>(0))
            .map_err(|e| map_sqlx_error("sparepart_exists", e))
    }

    #[instrument(skip(self), fields(sparepart_id = %id), err)]
    async fn get_sparepart(&self, id: SparepartId) -> Result<Option<Sparepart>, RegistryError> {
        let row = sqlx::query(
            "SELECT id, name, sku, created_at, updated_at FROM spareparts WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_sparepart", e))?;

        row.map(|r| SparepartRow::from_row(&r).map(Sparepart::from))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_sparepart", e))
    }

    #[instrument(skip(self), err)]
    async fn list_spareparts(&self) -> Result<Vec<Sparepart>, RegistryError> {
        let rows = sqlx::query(
            "SELECT id, name, sku, created_at, updated_at FROM spareparts \
             ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_spareparts", e))?;

        rows.iter()
            .map(|r| SparepartRow::from_row(r).map(Sparepart::from))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_sparepart", e))
    }

    #[instrument(skip(self, new), fields(sku = new.sku()), err)]
    async fn register_sparepart(&self, new: NewSparepart) -> Result<Sparepart, RegistryError> {
        let sparepart = new.into_sparepart(SparepartId::new(), Utc::now());

        sqlx::query(
            "INSERT INTO spareparts (id, name, sku, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(sparepart.id.as_uuid())
        .bind(&sparepart.name)
        .bind(&sparepart.sku)
        .bind(sparepart.created_at)
        .bind(sparepart.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::conflict(format!(
                    "Sparepart with SKU {} already exists",
                    sparepart.sku
                ))
                .into()
            } else {
                map_sqlx_error("register_sparepart", e)
            }
        })?;

        Ok(sparepart)
    }
}

// SQLx row types

#[derive(Debug)]
struct WarehouseRow {
    id: uuid::Uuid,
    name: String,
    code: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for WarehouseRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(WarehouseRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            code: row.try_get("code")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Warehouse {
            id: WarehouseId::from_uuid(row.id),
            name: row.name,
            code: row.code,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct SparepartRow {
    id: uuid::Uuid,
    name: String,
    sku: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for SparepartRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SparepartRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<SparepartRow> for Sparepart {
    fn from(row: SparepartRow) -> Self {
        Sparepart {
            id: SparepartId::from_uuid(row.id),
            name: row.name,
            sku: row.sku,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partstock_stock::StockError;

    #[test]
    fn pool_exhaustion_during_existence_check_is_retryable() {
        let err = map_sqlx_error("warehouse_exists", sqlx::Error::PoolTimedOut);
        assert!(matches!(err, RegistryError::Unavailable(_)));

        let err: StockError = err.into();
        assert!(err.is_retryable());
    }

    #[test]
    fn dropped_connection_is_retryable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = map_sqlx_error("sparepart_exists", sqlx::Error::Io(io));
        assert!(err.is_retryable());
    }

    #[test]
    fn decode_failures_stay_storage_errors() {
        let err: StockError = map_sqlx_error("get_warehouse", sqlx::Error::RowNotFound).into();
        assert!(matches!(err, StockError::Storage(_)));
    }
}
