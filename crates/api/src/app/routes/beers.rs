use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};

use beerstock_core::BeerId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_beer).get(list_beers))
        .route("/:key", get(find_by_name).delete(delete_by_id))
        .route("/:key/increment", patch(increment))
}

pub async fn create_beer(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::CreateBeerRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };
    let candidate = match body.validate() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.stock().create(candidate).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

pub async fn find_by_name(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
) -> axum::response::Response {
    match services.stock().find_by_name(&name).await {
        Ok(beer) => (StatusCode::OK, Json(beer)).into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

pub async fn list_beers(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.stock().list_all().await {
        Ok(beers) => (StatusCode::OK, Json(beers)).into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

pub async fn delete_by_id(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: BeerId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.stock().delete_by_id(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}

pub async fn increment(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<dto::QuantityRequest>, JsonRejection>,
) -> axum::response::Response {
    let id: BeerId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let Json(body) = match body {
        Ok(v) => v,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let quantity = match body.validate() {
        Ok(q) => q,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.stock().increment(id, quantity).await {
        Ok(beer) => (StatusCode::OK, Json(beer)).into_response(),
        Err(e) => errors::stock_error_to_response(e),
    }
}
