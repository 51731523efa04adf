use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use partstock_core::DomainError;
use partstock_infra::RegistryError;
use partstock_stock::StockError;

pub fn stock_error_to_response(err: StockError) -> Response {
    let code = err.code();
    match err {
        StockError::NotFound(missing) => {
            json_error(StatusCode::NOT_FOUND, code, missing.to_string())
        }
        StockError::InvalidArgument(msg) => json_error(StatusCode::BAD_REQUEST, code, msg),
        StockError::InsufficientStock {
            available,
            requested,
        } => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({
                "error": code,
                "message": err.to_string(),
                "available": available,
                "requested": requested,
            })),
        )
            .into_response(),
        StockError::Retryable(msg) => json_error(StatusCode::SERVICE_UNAVAILABLE, code, msg),
        StockError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, code, "internal storage error")
        }
    }
}

pub fn registry_error_to_response(err: RegistryError) -> Response {
    match err {
        RegistryError::Domain(DomainError::Validation(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        RegistryError::Domain(DomainError::InvalidId(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_id", msg)
        }
        RegistryError::Domain(DomainError::Conflict(msg)) => {
            json_error(StatusCode::CONFLICT, "conflict", msg)
        }
        RegistryError::Unavailable(msg) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "retryable", msg)
        }
        RegistryError::Backend(msg) => {
            tracing::error!(error = %msg, "registry failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "internal storage error",
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    registry_error_to_response(RegistryError::Domain(err))
}

pub fn json_rejection_to_response(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}

pub fn query_rejection_to_response(rejection: QueryRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}

/// Parse an id from a path or body field, naming the field in the error.
pub fn parse_id<T: FromStr>(field: &str, raw: &str) -> Result<T, Response> {
    raw.trim().parse::<T>().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("{field} must be a UUID"),
        )
    })
}

/// Like [`parse_id`] for a parameter that must be present.
pub fn require_id<T: FromStr>(field: &str, raw: Option<&str>) -> Result<T, Response> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => parse_id(field, raw),
        _ => Err(json_error(
            StatusCode::BAD_REQUEST,
            "invalid_argument",
            format!("{field} is required"),
        )),
    }
}

/// Absent or blank means "no constraint".
pub fn optional_id<T: FromStr>(field: &str, raw: Option<&str>) -> Result<Option<T>, Response> {
    match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_id(field, raw).map(Some),
        _ => Ok(None),
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_registry_is_service_unavailable() {
        let resp = registry_error_to_response(RegistryError::Unavailable("pool timed out".into()));
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn duplicate_key_is_conflict() {
        let resp = domain_error_to_response(DomainError::conflict("taken"));
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
