use axum::{Router, routing::get};

pub mod spareparts;
pub mod stock;
pub mod system;
pub mod warehouses;

/// Router for all business endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/warehouses", warehouses::router())
        .nest("/spareparts", spareparts::router())
        .nest("/stock", stock::router())
}
