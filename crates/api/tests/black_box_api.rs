use std::sync::Arc;

use partstock_api::app::{AppServices, build_app};
use partstock_infra::MutationPolicy;
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod on in-memory stores, bound to an ephemeral port.
        let app = build_app(AppServices::in_memory(MutationPolicy::default()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
    let res = client.post(url).json(&body).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn get(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

/// Registers one warehouse and one part, returning their ids.
async fn seed_pair(srv: &TestServer, client: &reqwest::Client) -> (String, String) {
    let (status, wh) = post(
        client,
        srv.url("/warehouses"),
        json!({"name": "Warehouse Jakarta", "code": "WH-JKT"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, sp) = post(
        client,
        srv.url("/spareparts"),
        json!({"name": "Brake Pad", "sku": "BP-001"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (
        wh["id"].as_str().unwrap().to_string(),
        sp["id"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn health_reports_storage_backend() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "in_memory");
}

#[tokio::test]
async fn registry_validation_and_uniqueness() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    seed_pair(&srv, &client).await;

    let (status, body) = post(
        &client,
        srv.url("/warehouses"),
        json!({"name": "Another", "code": "WH-JKT"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Warehouse with code WH-JKT already exists");

    let (status, body) = post(
        &client,
        srv.url("/spareparts"),
        json!({"name": "Oil", "sku": "lower-case"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, list) = get(&client, srv.url("/warehouses")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let ghost = "0190f5b2-7c3e-7000-8000-000000000000";

    let (status, body) = get(&client, srv.url(&format!("/warehouses/{ghost}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], format!("Warehouse with ID {ghost} not found"));

    let (status, body) = get(&client, srv.url("/spareparts/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (_, sp) = post(
        &client,
        srv.url("/spareparts"),
        json!({"name": "Brake Pad", "sku": "BP-001"}),
    )
    .await;
    let (status, body) = post(
        &client,
        srv.url("/stock/in"),
        json!({"warehouseId": ghost, "sparepartId": sp["id"], "quantity": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "warehouse_not_found");
}

#[tokio::test]
async fn stock_in_out_query_and_history() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (wh, sp) = seed_pair(&srv, &client).await;
    let pair_query = format!("warehouseId={wh}&sparepartId={sp}");

    let (status, _) = get(&client, srv.url(&format!("/stock?{pair_query}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, movement) = post(
        &client,
        srv.url("/stock/in"),
        json!({"warehouseId": wh, "sparepartId": sp, "quantity": 100}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(movement["kind"], "CREDIT");
    assert_eq!(movement["quantity"], 100);

    let (status, movement) = post(
        &client,
        srv.url("/stock/out"),
        json!({"warehouseId": wh, "sparepartId": sp, "quantity": 30}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(movement["kind"], "DEBIT");

    let (status, balance) = get(&client, srv.url(&format!("/stock?{pair_query}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(balance["currentStock"], 70);

    let history_url = srv.url(&format!("/stock/history?warehouseId={wh}"));
    let (status, history) = get(&client, history_url).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["kind"], "DEBIT");

    let (status, report) = get(&client, srv.url(&format!("/stock/reconcile?{pair_query}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["consistent"], true);
    assert_eq!(report["totalCredit"], 100);
    assert_eq!(report["totalDebit"], 30);
}

#[tokio::test]
async fn rejected_movements_map_to_client_errors() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (wh, sp) = seed_pair(&srv, &client).await;

    let (status, body) = post(
        &client,
        srv.url("/stock/out"),
        json!({"warehouseId": wh, "sparepartId": sp, "quantity": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "stock_not_found");

    post(
        &client,
        srv.url("/stock/in"),
        json!({"warehouseId": wh, "sparepartId": sp, "quantity": 20}),
    )
    .await;

    let (status, body) = post(
        &client,
        srv.url("/stock/out"),
        json!({"warehouseId": wh, "sparepartId": sp, "quantity": 30}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["message"], "Insufficient stock. Available: 20, Requested: 30");
    assert_eq!(body["available"], 20);
    assert_eq!(body["requested"], 30);

    let (status, body) = post(
        &client,
        srv.url("/stock/in"),
        json!({"warehouseId": wh, "sparepartId": sp, "quantity": -5}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Quantity must be greater than 0");

    let (status, body) = post(
        &client,
        srv.url("/stock/in"),
        json!({"warehouseId": "nope", "sparepartId": sp, "quantity": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "warehouseId must be a UUID");

    let (status, body) = get(&client, srv.url(&format!("/stock?warehouseId={wh}"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "sparepartId is required");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_http_debits_never_oversell() {
    let srv = Arc::new(TestServer::spawn().await);
    let client = reqwest::Client::new();
    let (wh, sp) = seed_pair(&srv, &client).await;

    post(
        &client,
        srv.url("/stock/in"),
        json!({"warehouseId": wh, "sparepartId": sp, "quantity": 50}),
    )
    .await;

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let client = client.clone();
            let url = srv.url("/stock/out");
            let body = json!({"warehouseId": wh, "sparepartId": sp, "quantity": 30});
            tokio::spawn(async move { post(&client, url, body).await.0 })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::CREATED => created += 1,
            other => assert_eq!(other, StatusCode::BAD_REQUEST),
        }
    }
    assert_eq!(created, 1);

    let (_, balance) = get(
        &client,
        srv.url(&format!("/stock?warehouseId={wh}&sparepartId={sp}")),
    )
    .await;
    assert_eq!(balance["currentStock"], 20);
}
