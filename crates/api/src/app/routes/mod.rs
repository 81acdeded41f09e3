use axum::Router;

pub mod beers;
pub mod system;

/// Router for all catalog endpoints.
pub fn router() -> Router {
    Router::new().nest("/api/v1/beers", beers::router())
}
