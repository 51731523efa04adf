use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use partstock_catalog::NewWarehouse;
use partstock_core::WarehouseId;
use partstock_infra::WarehouseRegistry;
use partstock_stock::Missing;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_warehouses).post(create_warehouse))
        .route("/:id", get(get_warehouse))
}

pub async fn create_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateWarehouseRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let new = match NewWarehouse::new(&body.name, &body.code) {
        Ok(n) => n,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.warehouses.register_warehouse(new).await {
        Ok(warehouse) => (StatusCode::CREATED, Json(warehouse)).into_response(),
        Err(e) => errors::registry_error_to_response(e),
    }
}

pub async fn list_warehouses(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.warehouses.list_warehouses().await {
        Ok(all) => Json(all).into_response(),
        Err(e) => errors::registry_error_to_response(e),
    }
}

pub async fn get_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: WarehouseId = match errors::parse_id("id", &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.warehouses.get_warehouse(id).await {
        Ok(Some(warehouse)) => Json(warehouse).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "warehouse_not_found",
            Missing::Warehouse(id).to_string(),
        ),
        Err(e) => errors::registry_error_to_response(e),
    }
}
