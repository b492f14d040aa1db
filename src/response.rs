//! Response types for the aggregator API.

use crate::stats::{Advisory, UserPosition, VaultStats};
use serde::Serialize;

/// Response from the health endpoint.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub session: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    pub chain_id: String,
    pub rpc_status: &'static str,
    pub uptime_secs: u64,
    pub requests: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<Advisory>,
}

/// Aggregate statistics snapshot.
#[derive(Serialize)]
pub struct StatsResponse {
    pub connected: bool,
    pub stats: VaultStats,
}

/// The connected account's position snapshot.
#[derive(Serialize)]
pub struct PositionResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    pub signer_balance: f64,
    pub position: UserPosition,
}

/// Response from the connect and refresh endpoints.
#[derive(Serialize)]
pub struct ConnectResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConnectResponse {
    pub fn ok(account: String) -> Self {
        Self {
            success: true,
            account: Some(account),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            account: None,
            error: Some(error.into()),
        }
    }
}
