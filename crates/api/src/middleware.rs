use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Pick a request id (caller-supplied UUID or a fresh UUIDv7), run the
/// request inside a span carrying it, and echo it on the response.
pub async fn request_context(req: Request, next: Next) -> Response {
    let request_id = extract_request_id(req.headers()).unwrap_or_else(Uuid::now_v7);

    let span = tracing::info_span!(
        "request",
        %request_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut res = async move {
        let res = next.run(req).await;
        tracing::info!(status = res.status().as_u16(), "request completed");
        res
    }
    .instrument(span)
    .await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        res.headers_mut().insert(X_REQUEST_ID, value);
    }
    res
}

fn extract_request_id(headers: &HeaderMap) -> Option<Uuid> {
    let header = headers.get(X_REQUEST_ID)?;
    let header = header.to_str().ok()?;
    Uuid::parse_str(header.trim()).ok()
}
