//! Typed read-only bindings for the vault and token contracts.
//!
//! Amount-valued view methods return 10^18 fixed-point integers as decimal
//! strings; counts are plain JSON numbers.

use crate::rpc::RpcClient;
use crate::Error;
use near_primitives::types::AccountId;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Action code recorded when tokens enter the vault.
pub const ACTION_STAKE: u8 = 1;
/// Action code recorded when tokens leave the vault.
pub const ACTION_UNSTAKE: u8 = 2;

/// One entry of an account's vault activity log.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityRecord {
    pub action: u8,
    /// Reward amount, 10^18 fixed point, as a decimal string.
    pub reward: String,
}

impl ActivityRecord {
    pub fn reward_amount(&self) -> Result<u128, Error> {
        parse_amount(&self.reward)
    }
}

/// Parse a fixed-point amount string as returned by both contracts.
pub fn parse_amount(s: &str) -> Result<u128, Error> {
    s.parse::<u128>()
        .map_err(|e| Error::Rpc(format!("malformed amount {s:?}: {e}")))
}

/// Fungible token contract views.
pub struct TokenContract {
    rpc: Arc<RpcClient>,
    contract_id: AccountId,
}

impl TokenContract {
    pub fn new(rpc: Arc<RpcClient>, contract_id: AccountId) -> Self {
        Self { rpc, contract_id }
    }

    pub fn contract_id(&self) -> &AccountId {
        &self.contract_id
    }

    pub async fn balance_of(&self, account_id: &AccountId) -> Result<u128, Error> {
        let raw: String = self
            .rpc
            .call_view(
                &self.contract_id,
                "ft_balance_of",
                json!({ "account_id": account_id }),
            )
            .await?;
        parse_amount(&raw)
    }

    pub async fn total_supply(&self) -> Result<u128, Error> {
        let raw: String = self
            .rpc
            .call_view(&self.contract_id, "ft_total_supply", json!({}))
            .await?;
        parse_amount(&raw)
    }

    /// Number of distinct addresses currently holding the token.
    pub async fn holder_count(&self) -> Result<u64, Error> {
        self.rpc
            .call_view(&self.contract_id, "get_holder_count", json!({}))
            .await
    }
}

/// Staking vault contract views.
pub struct VaultContract {
    rpc: Arc<RpcClient>,
    contract_id: AccountId,
}

impl VaultContract {
    pub fn new(rpc: Arc<RpcClient>, contract_id: AccountId) -> Self {
        Self { rpc, contract_id }
    }

    pub fn contract_id(&self) -> &AccountId {
        &self.contract_id
    }

    /// Count of positions removed before their lock expired.
    pub async fn early_removed_count(&self) -> Result<u64, Error> {
        self.rpc
            .call_view(&self.contract_id, "get_early_removed_count", json!({}))
            .await
    }

    /// Additional reward reserve reported by the vault.
    pub async fn bonus_pool(&self) -> Result<u128, Error> {
        let raw: String = self
            .rpc
            .call_view(&self.contract_id, "get_bonus_pool", json!({}))
            .await?;
        parse_amount(&raw)
    }

    /// Total count of currently staked tokens across all accounts.
    pub async fn total_staked(&self) -> Result<u64, Error> {
        self.rpc
            .call_view(&self.contract_id, "get_total_staked", json!({}))
            .await
    }

    /// Length of `account_id`'s activity log.
    pub async fn activity_count(&self, account_id: &AccountId) -> Result<u64, Error> {
        self.rpc
            .call_view(
                &self.contract_id,
                "get_activity_count",
                json!({ "account_id": account_id }),
            )
            .await
    }

    /// One activity record by index.
    pub async fn activity(
        &self,
        account_id: &AccountId,
        index: u64,
    ) -> Result<ActivityRecord, Error> {
        self.rpc
            .call_view(
                &self.contract_id,
                "get_activity",
                json!({ "account_id": account_id, "index": index }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_ok() {
        assert_eq!(parse_amount("0").unwrap(), 0);
        assert_eq!(
            parse_amount("2500000000000000000").unwrap(),
            2_500_000_000_000_000_000
        );
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount("-5").is_err());
        assert!(parse_amount("1.5e18").is_err());
    }

    #[test]
    fn test_activity_record_deserializes() {
        let record: ActivityRecord =
            serde_json::from_str(r#"{"action": 1, "reward": "1000000000000000000"}"#).unwrap();
        assert_eq!(record.action, ACTION_STAKE);
        assert_eq!(record.reward_amount().unwrap(), 1_000_000_000_000_000_000);
    }

    #[test]
    fn test_activity_record_bad_reward_errors() {
        let record = ActivityRecord {
            action: ACTION_UNSTAKE,
            reward: "not-a-number".into(),
        };
        assert!(record.reward_amount().is_err());
    }
}
