//! Request correlation and API-key middleware.

use axum::extract::Request;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::OnceLock;
use subtle::ConstantTimeEq;

/// Cached API key from env. `None` = dev mode (no auth).
static API_KEY: OnceLock<Option<String>> = OnceLock::new();

fn expected_api_key() -> &'static Option<String> {
    API_KEY.get_or_init(|| {
        std::env::var("AGGREGATOR_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
    })
}

/// Validate the `X-Api-Key` header on control endpoints, in constant time.
/// Bypassed entirely when `AGGREGATOR_API_KEY` is unset.
pub async fn api_key_auth(request: Request, next: Next) -> Response {
    let expected = match expected_api_key() {
        Some(key) => key,
        None => return next.run(request).await,
    };

    let authorized = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|provided| {
            provided.len() == expected.len()
                && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
        })
        .unwrap_or(false);

    if authorized {
        next.run(request).await
    } else {
        let body = serde_json::json!({
            "success": false,
            "error": "Unauthorized: invalid or missing API key"
        });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

/// Propagate or generate `x-request-id` for end-to-end correlation.
pub async fn inject_request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            use rand::Rng;
            format!("agg-{:016x}", rand::thread_rng().gen::<u64>())
        });

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Request correlation ID, extractable from `Request::extensions()`.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);
