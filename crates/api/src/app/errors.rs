use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use beerstock_core::DomainError;
use beerstock_inventory::StockError;

pub fn stock_error_to_response(err: StockError) -> axum::response::Response {
    match err {
        StockError::Domain(e) => domain_error_to_response(e),
        StockError::Store(e) => {
            tracing::error!("record store failure: {e}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::AlreadyRegistered(_) => {
            json_error(StatusCode::BAD_REQUEST, "already_registered", message)
        }
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::StockExceeded { .. } => {
            json_error(StatusCode::BAD_REQUEST, "stock_exceeded", message)
        }
        DomainError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
    }
}

/// Bodies that fail to parse are boundary violations like any other.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    tracing::debug!("rejected request body: {rejection}");
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
