use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use partstock_stock::MovementKind;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_stock))
        .route("/in", post(stock_in))
        .route("/out", post(stock_out))
        .route("/history", get(get_history))
        .route("/reconcile", get(reconcile))
}

pub async fn stock_in(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::StockMovementBody>, JsonRejection>,
) -> Response {
    record_movement(&services, MovementKind::Credit, body).await
}

pub async fn stock_out(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::StockMovementBody>, JsonRejection>,
) -> Response {
    record_movement(&services, MovementKind::Debit, body).await
}

async fn record_movement(
    services: &AppServices,
    kind: MovementKind,
    body: Result<Json<dto::StockMovementBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let request = match body.into_request() {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    let outcome = match kind {
        MovementKind::Credit => services.mutator.credit(request).await,
        MovementKind::Debit => services.mutator.debit(request).await,
    };

    match outcome {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::PairQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };
    let pair = match query.pair() {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.queries.get_balance(pair).await {
        Ok(balance) => Json(balance).into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

pub async fn get_history(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::PairQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };
    let filter = match query.filter() {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match services.queries.get_history(filter).await {
        Ok(movements) => Json(movements).into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

pub async fn reconcile(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::PairQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };
    let pair = match query.pair() {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.queries.reconcile(pair).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}
