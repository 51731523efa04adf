//! Postgres-backed ledger store.
//!
//! Each [`LedgerUnit`] is one database transaction. The pair lock is the row
//! lock taken by `SELECT ... FOR UPDATE` on `warehouse_stocks`; a missing row is
//! created with `INSERT ... ON CONFLICT DO NOTHING` before locking so that
//! concurrent first credits converge on the single row guarded by the
//! `(warehouse_id, sparepart_id)` unique constraint.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | LedgerStoreError |
//! |------------|----------------------|------------------|
//! | Database (deadlock detected) | `40P01` | `Contention` |
//! | Database (serialization failure) | `40001` | `Contention` |
//! | Database (lock not available) | `55P03` | `Contention` |
//! | Database (query canceled, lock_timeout) | `57014` | `Contention` |
//! | Database (unique violation) | `23505` | `Contention` |
//! | Database (other) | Any other | `Backend` |
//! | PoolTimedOut / PoolClosed / Io | N/A | `Unavailable` |
//! | Other | N/A | `Backend` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use partstock_core::{BalanceId, MovementId, SparepartId, WarehouseId};
use partstock_stock::{Balance, Movement, MovementKind, StockPair};

use super::r#trait::{LedgerStore, LedgerStoreError, LedgerUnit, MovementFilter, PairSnapshot};

const BALANCE_COLUMNS: &str = "id, warehouse_id, sparepart_id, current_stock, updated_at";
const MOVEMENT_COLUMNS: &str = "id, warehouse_id, sparepart_id, kind, quantity, created_at";

/// Postgres-backed ledger store.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
    lock_timeout: Duration,
}

impl PostgresLedgerStore {
    /// `lock_timeout` bounds how long a unit waits for a pair's row lock
    /// before the wait fails as contention.
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self {
            pool: Arc::new(pool),
            lock_timeout,
        }
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self), fields(lock_timeout_ms = self.lock_timeout.as_millis() as u64), err)]
    async fn begin(&self) -> Result<Box<dyn LedgerUnit>, LedgerStoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_lock_timeout", e))?;

        Ok(Box::new(PostgresUnit { tx, locked: None }))
    }

    #[instrument(skip(self), fields(pair = %pair), err)]
    async fn find_balance(&self, pair: StockPair) -> Result<Option<Balance>, LedgerStoreError> {
        let row = sqlx::query(&format!(
            "SELECT {BALANCE_COLUMNS} FROM warehouse_stocks \
             WHERE warehouse_id = $1 AND sparepart_id = $2"
        ))
        .bind(pair.warehouse_id.as_uuid())
        .bind(pair.sparepart_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_balance", e))?;

        row.map(decode_balance).transpose()
    }

    #[instrument(skip(self), fields(row_count = tracing::field::Empty), err)]
    async fn movements(&self, filter: &MovementFilter) -> Result<Vec<Movement>, LedgerStoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_transactions \
             WHERE ($1::uuid IS NULL OR warehouse_id = $1) \
               AND ($2::uuid IS NULL OR sparepart_id = $2) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.warehouse_id.map(|id| *id.as_uuid()))
        .bind(filter.sparepart_id.map(|id| *id.as_uuid()))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("movements", e))?;

        Span::current().record("row_count", rows.len());
        rows.into_iter().map(decode_movement).collect()
    }

    #[instrument(skip(self), fields(pair = %pair), err)]
    async fn pair_snapshot(&self, pair: StockPair) -> Result<PairSnapshot, LedgerStoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_snapshot", e))?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_isolation", e))?;

        let balance = sqlx::query(&format!(
            "SELECT {BALANCE_COLUMNS} FROM warehouse_stocks \
             WHERE warehouse_id = $1 AND sparepart_id = $2"
        ))
        .bind(pair.warehouse_id.as_uuid())
        .bind(pair.sparepart_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("snapshot_balance", e))?
        .map(decode_balance)
        .transpose()?;

        let movements = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_transactions \
             WHERE warehouse_id = $1 AND sparepart_id = $2 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(pair.warehouse_id.as_uuid())
        .bind(pair.sparepart_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("snapshot_movements", e))?
        .into_iter()
        .map(decode_movement)
        .collect::<Result<Vec<_>, _>>()?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_snapshot", e))?;

        Ok(PairSnapshot { balance, movements })
    }
}

struct PostgresUnit {
    tx: Transaction<'static, Postgres>,
    locked: Option<StockPair>,
}

impl PostgresUnit {
    fn claim(&mut self, pair: StockPair) -> Result<(), LedgerStoreError> {
        match self.locked {
            Some(held) if held != pair => Err(LedgerStoreError::InvalidUnit(format!(
                "unit holds {held} and cannot touch {pair}"
            ))),
            _ => {
                self.locked = Some(pair);
                Ok(())
            }
        }
    }

    fn ensure_held(&self, pair: StockPair) -> Result<(), LedgerStoreError> {
        match self.locked {
            Some(held) if held == pair => Ok(()),
            _ => Err(LedgerStoreError::InvalidUnit(format!(
                "{pair} must be locked before it is written"
            ))),
        }
    }
}

#[async_trait]
impl LedgerUnit for PostgresUnit {
    async fn lock_balance(&mut self, pair: StockPair) -> Result<Option<Balance>, LedgerStoreError> {
        self.claim(pair)?;

        let row = sqlx::query(&format!(
            "SELECT {BALANCE_COLUMNS} FROM warehouse_stocks \
             WHERE warehouse_id = $1 AND sparepart_id = $2 \
             FOR UPDATE"
        ))
        .bind(pair.warehouse_id.as_uuid())
        .bind(pair.sparepart_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_balance", e))?;

        row.map(decode_balance).transpose()
    }

    async fn lock_or_open_balance(
        &mut self,
        pair: StockPair,
        at: DateTime<Utc>,
    ) -> Result<Balance, LedgerStoreError> {
        self.claim(pair)?;

        let opened = Balance::open(pair, at);
        sqlx::query(
            r#"
            INSERT INTO warehouse_stocks (id, warehouse_id, sparepart_id, current_stock, updated_at)
            VALUES ($1, $2, $3, 0, $4)
            ON CONFLICT (warehouse_id, sparepart_id) DO NOTHING
            "#,
        )
        .bind(opened.id.as_uuid())
        .bind(pair.warehouse_id.as_uuid())
        .bind(pair.sparepart_id.as_uuid())
        .bind(at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("open_balance", e))?;

        self.lock_balance(pair).await?.ok_or_else(|| {
            LedgerStoreError::Backend(format!("balance for {pair} missing after upsert"))
        })
    }

    async fn write_balance(&mut self, balance: &Balance) -> Result<(), LedgerStoreError> {
        self.ensure_held(balance.pair())?;

        let result = sqlx::query(
            r#"
            UPDATE warehouse_stocks
            SET current_stock = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(balance.id.as_uuid())
        .bind(to_db_quantity(balance.current_stock)?)
        .bind(balance.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("write_balance", e))?;

        if result.rows_affected() != 1 {
            return Err(LedgerStoreError::Backend(format!(
                "balance {} not updated (rows affected: {})",
                balance.id,
                result.rows_affected()
            )));
        }
        Ok(())
    }

    async fn append_movement(&mut self, movement: &Movement) -> Result<(), LedgerStoreError> {
        self.ensure_held(movement.pair())?;

        sqlx::query(
            r#"
            INSERT INTO stock_transactions
                (id, warehouse_id, sparepart_id, kind, quantity, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(movement.id.as_uuid())
        .bind(movement.warehouse_id.as_uuid())
        .bind(movement.sparepart_id.as_uuid())
        .bind(movement.kind.as_str())
        .bind(to_db_quantity(movement.quantity)?)
        .bind(movement.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_movement", e))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerStoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerStoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback_transaction", e))
    }
}

fn to_db_quantity(value: u64) -> Result<i64, LedgerStoreError> {
    i64::try_from(value)
        .map_err(|_| LedgerStoreError::Backend(format!("quantity {value} exceeds BIGINT range")))
}

fn from_db_quantity(column: &str, value: i64) -> Result<u64, LedgerStoreError> {
    u64::try_from(value)
        .map_err(|_| LedgerStoreError::Backend(format!("negative {column} in storage: {value}")))
}

fn decode_balance(row: PgRow) -> Result<Balance, LedgerStoreError> {
    let row = BalanceRow::from_row(&row)
        .map_err(|e| LedgerStoreError::Backend(format!("failed to decode balance row: {e}")))?;
    Ok(Balance {
        id: BalanceId::from_uuid(row.id),
        warehouse_id: WarehouseId::from_uuid(row.warehouse_id),
        sparepart_id: SparepartId::from_uuid(row.sparepart_id),
        current_stock: from_db_quantity("current_stock", row.current_stock)?,
        updated_at: row.updated_at,
    })
}

fn decode_movement(row: PgRow) -> Result<Movement, LedgerStoreError> {
    let row = MovementRow::from_row(&row)
        .map_err(|e| LedgerStoreError::Backend(format!("failed to decode movement row: {e}")))?;
    let kind = MovementKind::parse(&row.kind)
        .ok_or_else(|| LedgerStoreError::Backend(format!("unknown movement kind '{}'", row.kind)))?;
    Ok(Movement {
        id: MovementId::from_uuid(row.id),
        warehouse_id: WarehouseId::from_uuid(row.warehouse_id),
        sparepart_id: SparepartId::from_uuid(row.sparepart_id),
        kind,
        quantity: from_db_quantity("quantity", row.quantity)?,
        created_at: row.created_at,
    })
}

/// Map SQLx errors to LedgerStoreError.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> LedgerStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // deadlock, serialization failure, lock_timeout, canceled wait
                Some("40P01" | "40001" | "55P03" | "57014") => LedgerStoreError::Contention(msg),
                // lost a race on a unique key; a retry sees the winner's row
                Some("23505") => LedgerStoreError::Contention(msg),
                _ => LedgerStoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            LedgerStoreError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => {
            LedgerStoreError::Unavailable(format!("io error in {operation}: {e}"))
        }
        _ => LedgerStoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

#[derive(Debug)]
struct BalanceRow {
    id: uuid::Uuid,
    warehouse_id: uuid::Uuid,
    sparepart_id: uuid::Uuid,
    current_stock: i64,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for BalanceRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(BalanceRow {
            id: row.try_get("id")?,
            warehouse_id: row.try_get("warehouse_id")?,
            sparepart_id: row.try_get("sparepart_id")?,
            current_stock: row.try_get("current_stock")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug)]
struct MovementRow {
    id: uuid::Uuid,
    warehouse_id: uuid::Uuid,
    sparepart_id: uuid::Uuid,
    kind: String,
    quantity: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for MovementRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MovementRow {
            id: row.try_get("id")?,
            warehouse_id: row.try_get("warehouse_id")?,
            sparepart_id: row.try_get("sparepart_id")?,
            kind: row.try_get("kind")?,
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
