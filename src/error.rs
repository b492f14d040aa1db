//! Error types for the aggregator.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt;

/// Aggregator error type.
///
/// Every variant is caught at the call site that produced it, logged, and
/// converted into a user-visible advisory. None propagates to a crash
/// boundary, and no failed call is retried within a cycle.
#[derive(Debug)]
pub enum Error {
    /// Configuration error.
    Config(String),
    /// Active chain does not match the required chain id.
    NetworkMismatch(String),
    /// A wallet connection attempt was refused or yielded no usable signer.
    ConnectionRejected(String),
    /// No wallet key material available at all. Permanent for the session.
    ProviderAbsent,
    /// RPC communication error (network, timeout, malformed response).
    Rpc(String),
    /// Indexing service error.
    Indexer(String),
}

impl Error {
    /// Short machine-readable label, used for advisories and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::NetworkMismatch(_) => "network_mismatch",
            Error::ConnectionRejected(_) => "connection_rejected",
            Error::ProviderAbsent => "provider_absent",
            Error::Rpc(_) => "rpc",
            Error::Indexer(_) => "indexer",
        }
    }

    /// HTTP status the presentation surface reports for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::NetworkMismatch(_) => StatusCode::PRECONDITION_FAILED,
            Error::ConnectionRejected(_) => StatusCode::FORBIDDEN,
            Error::ProviderAbsent => StatusCode::SERVICE_UNAVAILABLE,
            Error::Rpc(_) => StatusCode::BAD_GATEWAY,
            Error::Indexer(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::NetworkMismatch(msg) => write!(f, "network mismatch: {msg}"),
            Error::ConnectionRejected(msg) => write!(f, "wallet connection rejected: {msg}"),
            Error::ProviderAbsent => write!(f, "no wallet key material available"),
            Error::Rpc(msg) => write!(f, "rpc error: {msg}"),
            Error::Indexer(msg) => write!(f, "indexer error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string()
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_are_stable() {
        assert_eq!(Error::ProviderAbsent.kind(), "provider_absent");
        assert_eq!(Error::Rpc("x".into()).kind(), "rpc");
        assert_eq!(
            Error::NetworkMismatch("want mainnet".into()).kind(),
            "network_mismatch"
        );
    }

    #[test]
    fn test_display_includes_payload() {
        let e = Error::Indexer("timeout".into());
        assert_eq!(e.to_string(), "indexer error: timeout");
    }
}
