use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use partstock_catalog::NewSparepart;
use partstock_core::SparepartId;
use partstock_infra::SparepartRegistry;
use partstock_stock::Missing;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_spareparts).post(create_sparepart))
        .route("/:id", get(get_sparepart))
}

pub async fn create_sparepart(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateSparepartRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let new = match NewSparepart::new(&body.name, &body.sku) {
        Ok(n) => n,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.spareparts.register_sparepart(new).await {
        Ok(sparepart) => (StatusCode::CREATED, Json(sparepart)).into_response(),
        Err(e) => errors::registry_error_to_response(e),
    }
}

pub async fn list_spareparts(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.spareparts.list_spareparts().await {
        Ok(all) => Json(all).into_response(),
        Err(e) => errors::registry_error_to_response(e),
    }
}

pub async fn get_sparepart(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    let id: SparepartId = match errors::parse_id("id", &id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.spareparts.get_sparepart(id).await {
        Ok(Some(sparepart)) => Json(sparepart).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "sparepart_not_found",
            Missing::Sparepart(id).to_string(),
        ),
        Err(e) => errors::registry_error_to_response(e),
    }
}
