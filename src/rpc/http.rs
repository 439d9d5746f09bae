//! HTTP front end for the JSON-RPC dispatcher

use crate::rpc::dispatch::Dispatcher;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use std::sync::Arc;
use tracing::{debug, warn};

pub const CORS_HEADERS: [(HeaderName, &str); 4] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
    (header::ACCESS_CONTROL_MAX_AGE, "86400"),
];

pub const WRONG_PATH: &str = "Request Must Have Path Of /";
pub const WRONG_CONTENT_TYPE: &str = "Content-Type Must Be application/json";

/// Build the router serving the notebook protocol on `/`.
///
/// Every response carries the CORS headers, including the 405 and 413
/// replies axum produces itself.
pub fn create_router(dispatcher: Arc<Dispatcher>, max_request_bytes: usize) -> Router {
    Router::new()
        .route("/", post(handle_rpc).options(preflight))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(middleware::map_response(add_cors))
        .with_state(dispatcher)
}

async fn add_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    for (name, value) in CORS_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    response
}

async fn handle_rpc(
    State(dispatcher): State<Arc<Dispatcher>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_json(&headers) {
        warn!(
            "Rejecting request with Content-Type {:?}",
            headers.get(header::CONTENT_TYPE)
        );
        return (StatusCode::BAD_REQUEST, WRONG_CONTENT_TYPE).into_response();
    }

    debug!("Received {} byte request", body.len());

    match dispatcher.handle_body(&body).await {
        Some(reply) => (StatusCode::OK, Json(reply)).into_response(),
        None => StatusCode::OK.into_response(),
    }
}

async fn preflight() -> Response {
    StatusCode::OK.into_response()
}

async fn fallback(method: Method, uri: axum::http::Uri) -> Response {
    if method == Method::OPTIONS {
        return preflight().await;
    }
    warn!("Invalid request path: {}", uri.path());
    (StatusCode::NOT_FOUND, WRONG_PATH).into_response()
}

/// `application/json`, ignoring case and any media-type parameters.
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}
