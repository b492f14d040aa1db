//! Aggregator configuration.

use serde::Deserialize;

/// Configuration for the dashboard aggregator.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Required chain id. Sessions are only created on this chain.
    #[serde(default = "defaults::chain_id")]
    pub chain_id: String,

    #[serde(default = "defaults::rpc_url")]
    pub rpc_url: String,

    /// Staking vault contract account.
    #[serde(default = "defaults::vault_contract_id")]
    pub vault_contract_id: String,

    /// Fungible token contract account.
    #[serde(default = "defaults::token_contract_id")]
    pub token_contract_id: String,

    #[serde(default = "defaults::indexer_url")]
    pub indexer_url: String,

    #[serde(default = "defaults::keys_path")]
    pub keys_path: String,

    #[serde(default = "defaults::bind_address")]
    pub bind_address: String,

    /// Budget for a single RPC or indexer call. A stalled call fails the
    /// step, not the cycle.
    #[serde(default = "defaults::rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// Hard cap on activity records read per cycle.
    #[serde(default = "defaults::activity_scan_limit")]
    pub activity_scan_limit: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: defaults::chain_id(),
            rpc_url: defaults::rpc_url(),
            vault_contract_id: defaults::vault_contract_id(),
            token_contract_id: defaults::token_contract_id(),
            indexer_url: defaults::indexer_url(),
            keys_path: defaults::keys_path(),
            bind_address: defaults::bind_address(),
            rpc_timeout_secs: defaults::rpc_timeout_secs(),
            activity_scan_limit: defaults::activity_scan_limit(),
        }
    }
}

mod defaults {
    fn network() -> String {
        std::env::var("AGGREGATOR_NETWORK")
            .or_else(|_| std::env::var("NEAR_NETWORK"))
            .unwrap_or_else(|_| "mainnet".into())
    }

    pub fn chain_id() -> String {
        network()
    }

    pub fn rpc_url() -> String {
        if let Ok(url) = std::env::var("AGGREGATOR_RPC_URL") {
            if !url.is_empty() {
                return url;
            }
        }
        if network().contains("mainnet") {
            "https://rpc.mainnet.near.org".into()
        } else {
            "https://rpc.testnet.near.org".into()
        }
    }

    pub fn vault_contract_id() -> String {
        if network().contains("mainnet") {
            "vault.dustyvaults.near".into()
        } else {
            "vault.dustyvaults.testnet".into()
        }
    }

    pub fn token_contract_id() -> String {
        if network().contains("mainnet") {
            "token.dustyvaults.near".into()
        } else {
            "token.dustyvaults.testnet".into()
        }
    }

    pub fn indexer_url() -> String {
        "https://indexer.dustyvaults.io/v1".into()
    }

    pub fn keys_path() -> String {
        "./account_keys/owner.json".into()
    }

    pub fn bind_address() -> String {
        "0.0.0.0:3050".into()
    }

    pub fn rpc_timeout_secs() -> u64 {
        10
    }

    pub fn activity_scan_limit() -> u64 {
        500
    }
}
