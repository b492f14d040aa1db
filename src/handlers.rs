//! HTTP request handlers, the seam the presentation layer consumes.

use crate::aggregator::Aggregator;
use crate::metrics::METRICS;
use crate::middleware::RequestId;
use crate::response::{ConnectResponse, HealthResponse, PositionResponse, StatsResponse};
use crate::session::WalletEvent;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

/// Health check with session and RPC status.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session();
    let rpc_status = match state.rpc.chain_id().await {
        Ok(_) => "ok",
        Err(_) => "unreachable",
    };
    let status = if rpc_status != "ok" {
        "degraded"
    } else if session.is_connected() {
        "ok"
    } else {
        "disconnected"
    };

    Json(HealthResponse {
        status,
        session: session.label(),
        account: session.account_id().map(|a| a.to_string()),
        chain_id: state.config.chain_id.clone(),
        rpc_status,
        uptime_secs: state.start_time.elapsed().as_secs(),
        requests: state.request_count.load(Ordering::Relaxed),
        advisory: state.published.advisory(),
    })
}

/// Prometheus metrics in text exposition format.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = METRICS.render(state.session().is_connected());
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        body,
    )
}

/// Published aggregate statistics.
pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatsResponse {
        connected: state.session().is_connected(),
        stats: state.published.stats(),
    })
}

/// Published position of the connected account.
pub async fn position(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = state.session();
    Json(PositionResponse {
        connected: session.is_connected(),
        account: session.account_id().map(|a| a.to_string()),
        signer_balance: state.published.signer_balance(),
        position: state.published.position(),
    })
}

/// User-initiated connect: network guard, wallet connect, full fetch cycle.
pub async fn connect(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> (StatusCode, Json<ConnectResponse>) {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    let req_id = request_id(&request);
    info!(req_id = %req_id, "Connect requested");

    let aggregator = Aggregator::new(Arc::clone(&state));
    match aggregator.connect_and_refresh(false).await {
        Ok(()) => {
            let account = state
                .session()
                .account_id()
                .map(|a| a.to_string())
                .unwrap_or_default();
            (StatusCode::OK, Json(ConnectResponse::ok(account)))
        }
        Err(e) => {
            warn!(req_id = %req_id, error = %e, "Connect failed");
            (e.status_code(), Json(ConnectResponse::err(e.to_string())))
        }
    }
}

/// Re-run the fetch cycle for the current session.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> (StatusCode, Json<ConnectResponse>) {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    let req_id = request_id(&request);

    let session = state.session();
    let Some(account_id) = session.account_id().cloned() else {
        return (
            StatusCode::CONFLICT,
            Json(ConnectResponse::err("not connected")),
        );
    };

    info!(req_id = %req_id, account = %account_id, "Refresh requested");
    let aggregator = Aggregator::new(Arc::clone(&state));
    match aggregator.refresh().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ConnectResponse::ok(account_id.to_string())),
        ),
        Err(e) => (e.status_code(), Json(ConnectResponse::err(e.to_string()))),
    }
}

/// Correlation ID set by middleware, if present.
fn request_id(request: &Request) -> String {
    request
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default()
}

/// Provider-level wallet notification, forwarded to the event loop.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WalletEventRequest {
    AccountsChanged { account_id: String },
    ChainChanged { chain_id: String },
}

pub async fn wallet_event(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WalletEventRequest>,
) -> (StatusCode, Json<ConnectResponse>) {
    let event = match request {
        WalletEventRequest::AccountsChanged { account_id } => match account_id.parse() {
            Ok(account_id) => WalletEvent::AccountsChanged(account_id),
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ConnectResponse::err(format!("invalid account id: {e}"))),
                );
            }
        },
        WalletEventRequest::ChainChanged { chain_id } => WalletEvent::ChainChanged(chain_id),
    };

    match state.wallet_events.send(event).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(ConnectResponse {
                success: true,
                account: None,
                error: None,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "Wallet event loop unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ConnectResponse::err("event loop unavailable")),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_event_request_parses_tagged_json() {
        let parsed: WalletEventRequest = serde_json::from_str(
            r#"{"type": "accounts_changed", "account_id": "holder.testnet"}"#,
        )
        .unwrap();
        assert!(matches!(
            parsed,
            WalletEventRequest::AccountsChanged { account_id } if account_id == "holder.testnet"
        ));

        let parsed: WalletEventRequest =
            serde_json::from_str(r#"{"type": "chain_changed", "chain_id": "testnet"}"#).unwrap();
        assert!(matches!(parsed, WalletEventRequest::ChainChanged { .. }));
    }
}
