//! Concurrency tests for the full stock pipeline.
//!
//! Tests: Registry → BalanceMutator → LedgerStore → StockQueryService
//!
//! Verifies:
//! - Concurrent debits never take a balance below zero
//! - Every balance reconciles with its movement log
//! - Failed movements leave no trace
//! - Pairs are isolated from each other

use std::sync::Arc;

use tokio::sync::Barrier;

use partstock_catalog::{NewSparepart, NewWarehouse, Sparepart, Warehouse};
use partstock_core::{SparepartId, WarehouseId};
use partstock_stock::{Movement, MovementKind, StockError, StockPair, StockResult};

use crate::ledger::{InMemoryLedgerStore, MovementFilter};
use crate::mutator::{BalanceMutator, MovementRequest, MutationPolicy};
use crate::query::StockQueryService;
use crate::registry::{InMemoryRegistry, SparepartRegistry, WarehouseRegistry};

type Mutator = BalanceMutator<
    InMemoryLedgerStore,
    Arc<InMemoryRegistry<Warehouse>>,
    Arc<InMemoryRegistry<Sparepart>>,
>;

struct Harness {
    mutator: Arc<Mutator>,
    queries: StockQueryService<InMemoryLedgerStore>,
    warehouses: Arc<InMemoryRegistry<Warehouse>>,
    spareparts: Arc<InMemoryRegistry<Sparepart>>,
}

impl Harness {
    fn new() -> Self {
        let ledger = InMemoryLedgerStore::new();
        let warehouses = Arc::new(InMemoryRegistry::<Warehouse>::new());
        let spareparts = Arc::new(InMemoryRegistry::<Sparepart>::new());
        let mutator = BalanceMutator::new(
            ledger.clone(),
            Arc::clone(&warehouses),
            Arc::clone(&spareparts),
            MutationPolicy::default(),
        );
        Self {
            mutator: Arc::new(mutator),
            queries: StockQueryService::new(ledger),
            warehouses,
            spareparts,
        }
    }

    async fn warehouse(&self, code: &str) -> WarehouseId {
        self.warehouses
            .register_warehouse(NewWarehouse::new(&format!("Warehouse {code}"), code).unwrap())
            .await
            .unwrap()
            .id
    }

    async fn sparepart(&self, sku: &str) -> SparepartId {
        self.spareparts
            .register_sparepart(NewSparepart::new(&format!("Part {sku}"), sku).unwrap())
            .await
            .unwrap()
            .id
    }

    async fn seeded_pair(&self, code: &str, sku: &str, stock: i64) -> StockPair {
        let pair = StockPair::new(self.warehouse(code).await, self.sparepart(sku).await);
        self.mutator
            .credit(MovementRequest::new(pair.warehouse_id, pair.sparepart_id, stock))
            .await
            .unwrap();
        pair
    }

    /// Run all operations at once and collect their outcomes in input order.
    async fn concurrently(
        &self,
        ops: Vec<(MovementKind, StockPair, i64)>,
    ) -> Vec<StockResult<Movement>> {
        let barrier = Arc::new(Barrier::new(ops.len()));
        let handles: Vec<_> = ops
            .into_iter()
            .map(|(kind, pair, quantity)| {
                let mutator = Arc::clone(&self.mutator);
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    let request =
                        MovementRequest::new(pair.warehouse_id, pair.sparepart_id, quantity);
                    match kind {
                        MovementKind::Credit => mutator.credit(request).await,
                        MovementKind::Debit => mutator.debit(request).await,
                    }
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }
        outcomes
    }

    async fn stock(&self, pair: StockPair) -> u64 {
        self.queries.get_balance(pair).await.unwrap().current_stock
    }

    async fn assert_reconciles(&self, pair: StockPair) {
        let report = self.queries.reconcile(pair).await.unwrap();
        assert!(report.consistent, "ledger drifted: {report:?}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_debits_that_fit_both_succeed() {
    let h = Harness::new();
    let pair = h.seeded_pair("WH-1", "P-1", 100).await;

    let outcomes = h
        .concurrently(vec![
            (MovementKind::Debit, pair, 30),
            (MovementKind::Debit, pair, 40),
        ])
        .await;

    assert!(outcomes.iter().all(|o| o.is_ok()));
    assert_eq!(h.stock(pair).await, 30);

    let debits = h
        .queries
        .get_history(MovementFilter::for_pair(pair))
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.kind == MovementKind::Debit)
        .count();
    assert_eq!(debits, 2);
    h.assert_reconciles(pair).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn only_one_of_three_oversized_debits_succeeds() {
    let h = Harness::new();
    let pair = h.seeded_pair("WH-1", "P-1", 50).await;

    let outcomes = h
        .concurrently(vec![(MovementKind::Debit, pair, 30); 3])
        .await;

    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(succeeded, 1);
    for failure in outcomes.iter().filter_map(|o| o.as_ref().err()) {
        assert_eq!(
            failure,
            &StockError::InsufficientStock {
                available: 20,
                requested: 30
            }
        );
    }
    assert_eq!(h.stock(pair).await, 20);
    assert_eq!(
        h.queries
            .get_history(MovementFilter::for_pair(pair))
            .await
            .unwrap()
            .len(),
        2
    );
    h.assert_reconciles(pair).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_credits_and_debits_net_out() {
    let h = Harness::new();
    let pair = h.seeded_pair("WH-1", "P-1", 100).await;

    let outcomes = h
        .concurrently(vec![
            (MovementKind::Credit, pair, 50),
            (MovementKind::Debit, pair, 30),
            (MovementKind::Credit, pair, 20),
            (MovementKind::Debit, pair, 40),
        ])
        .await;

    assert!(outcomes.iter().all(|o| o.is_ok()));
    assert_eq!(h.stock(pair).await, 100);

    let report = h.queries.reconcile(pair).await.unwrap();
    assert!(report.consistent);
    // The seed credit of 100 is included in the ledger totals.
    assert_eq!(report.totals.total_credit, 170);
    assert_eq!(report.totals.total_debit, 70);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pairs_sharing_a_part_stay_independent() {
    let h = Harness::new();
    let part = h.sparepart("P-1").await;
    let a = StockPair::new(h.warehouse("WH-1").await, part);
    let b = StockPair::new(h.warehouse("WH-2").await, part);
    for pair in [a, b] {
        h.mutator
            .credit(MovementRequest::new(pair.warehouse_id, pair.sparepart_id, 100))
            .await
            .unwrap();
    }

    let outcomes = h
        .concurrently(vec![
            (MovementKind::Debit, a, 60),
            (MovementKind::Credit, b, 25),
            (MovementKind::Debit, a, 60),
            (MovementKind::Debit, b, 125),
            (MovementKind::Credit, a, 5),
        ])
        .await;

    // Exactly one of the two 60-unit debits on `a` can fit.
    assert!(outcomes[1].is_ok());
    assert!(outcomes[4].is_ok());
    assert_eq!(
        outcomes[0].is_ok() as u8 + outcomes[2].is_ok() as u8,
        1,
        "{outcomes:?}"
    );
    assert_eq!(h.stock(a).await, 45);

    // 125 only fits if the 25 credit landed first.
    let b_expected = if outcomes[3].is_ok() { 0 } else { 125 };
    assert_eq!(h.stock(b).await, b_expected);

    h.assert_reconciles(a).await;
    h.assert_reconciles(b).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn uniform_debits_succeed_floor_of_stock_over_quantity_times() {
    for (stock, quantity, attempts) in [(100_i64, 7_i64, 20_usize), (50, 10, 8), (99, 33, 6)] {
        let h = Harness::new();
        let pair = h.seeded_pair("WH-1", "P-1", stock).await;

        let outcomes = h
            .concurrently(vec![(MovementKind::Debit, pair, quantity); attempts])
            .await;

        let expected = (stock / quantity) as usize;
        let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
        assert_eq!(succeeded, expected, "S={stock} Q={quantity}");
        assert!(
            outcomes
                .iter()
                .filter_map(|o| o.as_ref().err())
                .all(|e| matches!(e, StockError::InsufficientStock { .. }))
        );
        assert_eq!(h.stock(pair).await, (stock % quantity) as u64);
        h.assert_reconciles(pair).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_credits_create_a_single_balance() {
    let h = Harness::new();
    let pair = StockPair::new(h.warehouse("WH-1").await, h.sparepart("P-1").await);

    let outcomes = h
        .concurrently(vec![(MovementKind::Credit, pair, 3); 10])
        .await;

    assert!(outcomes.iter().all(|o| o.is_ok()));
    assert_eq!(h.stock(pair).await, 30);
    h.assert_reconciles(pair).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rejected_debit_changes_nothing() {
    let h = Harness::new();
    let pair = h.seeded_pair("WH-1", "P-1", 20).await;
    let before = h.queries.get_balance(pair).await.unwrap();

    let err = h
        .mutator
        .debit(MovementRequest::new(pair.warehouse_id, pair.sparepart_id, 30))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Insufficient stock. Available: 20, Requested: 30");

    assert_eq!(h.queries.get_balance(pair).await.unwrap(), before);
    assert_eq!(
        h.queries
            .get_history(MovementFilter::for_pair(pair))
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn history_filters_by_each_dimension() {
    let h = Harness::new();
    let part = h.sparepart("P-1").await;
    let other_part = h.sparepart("P-2").await;
    let wh = h.warehouse("WH-1").await;
    let other_wh = h.warehouse("WH-2").await;

    for (w, p) in [(wh, part), (wh, other_part), (other_wh, part)] {
        h.mutator
            .credit(MovementRequest::new(w, p, 1))
            .await
            .unwrap();
    }

    let by_warehouse = MovementFilter {
        warehouse_id: Some(wh),
        sparepart_id: None,
    };
    let by_part = MovementFilter {
        warehouse_id: None,
        sparepart_id: Some(part),
    };
    assert_eq!(h.queries.get_history(by_warehouse).await.unwrap().len(), 2);
    assert_eq!(h.queries.get_history(by_part).await.unwrap().len(), 2);
    assert_eq!(h.queries.get_history(MovementFilter::all()).await.unwrap().len(), 3);

    let all = h.queries.get_history(MovementFilter::all()).await.unwrap();
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}
