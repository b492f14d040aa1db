//! Read-only JSON-RPC client for contract view calls.

use crate::Error;
use near_jsonrpc_client::{methods, JsonRpcClient};
use near_jsonrpc_primitives::types::query::QueryResponseKind;
use near_primitives::types::{AccountId, BlockReference, Finality, FunctionArgs};
use near_primitives::views::QueryRequest;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use crate::metrics::METRICS;

/// Thin wrapper over the JSON-RPC endpoint. Every call runs under a bounded
/// timeout; a failed call is abandoned for the cycle, never retried.
pub struct RpcClient {
    client: JsonRpcClient,
    url: String,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(url: &str, timeout: Duration) -> Self {
        info!(rpc = url, timeout_secs = timeout.as_secs(), "RPC client initialized");
        Self {
            client: JsonRpcClient::connect(url),
            url: url.to_string(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Chain id reported by the node (e.g. "mainnet"). Used by the network
    /// guard before any session is created.
    pub async fn chain_id(&self) -> Result<String, Error> {
        let status = tokio::time::timeout(
            self.timeout,
            self.client.call(methods::status::RpcStatusRequest),
        )
        .await
        .map_err(|_| {
            METRICS.rpc_errors.bump();
            Error::Rpc(format!("status timed out after {}s", self.timeout.as_secs()))
        })?
        .map_err(|e| {
            METRICS.rpc_errors.bump();
            Error::Rpc(format!("status failed: {e}"))
        })?;
        Ok(status.chain_id)
    }

    /// Call a read-only view method at final block height and deserialize
    /// its JSON result.
    pub async fn call_view<T: DeserializeOwned>(
        &self,
        contract_id: &AccountId,
        method_name: &str,
        args: serde_json::Value,
    ) -> Result<T, Error> {
        METRICS.rpc_calls.bump();

        let args = serde_json::to_vec(&args)
            .map_err(|e| Error::Rpc(format!("{method_name}: args serialization: {e}")))?;
        let request = methods::query::RpcQueryRequest {
            block_reference: BlockReference::Finality(Finality::Final),
            request: QueryRequest::CallFunction {
                account_id: contract_id.clone(),
                method_name: method_name.to_string(),
                args: FunctionArgs::from(args),
            },
        };

        let resp = tokio::time::timeout(self.timeout, self.client.call(request))
            .await
            .map_err(|_| {
                METRICS.rpc_errors.bump();
                Error::Rpc(format!(
                    "{contract_id}.{method_name} timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                METRICS.rpc_errors.bump();
                Error::Rpc(format!("{contract_id}.{method_name} failed: {e}"))
            })?;

        match resp.kind {
            QueryResponseKind::CallResult(result) => {
                debug!(contract = %contract_id, method = method_name, "View call ok");
                serde_json::from_slice(&result.result).map_err(|e| {
                    Error::Rpc(format!("{contract_id}.{method_name} malformed result: {e}"))
                })
            }
            other => {
                METRICS.rpc_errors.bump();
                Err(Error::Rpc(format!("unexpected query response: {other:?}")))
            }
        }
    }
}
