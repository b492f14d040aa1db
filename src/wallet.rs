//! Wallet connection: key material discovery and the network guard.
//!
//! The "wallet provider" of the headless service is local key material, in
//! the near-cli JSON format, supplied via `AGGREGATOR_KEYS_JSON` or a key
//! file. Connecting validates the chain first and never creates a session
//! on the wrong network.

use crate::rpc::RpcClient;
use crate::session::Session;
use crate::Error;
use near_crypto::{InMemorySigner, SecretKey, Signer};
use near_primitives::types::AccountId;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub struct WalletConnector {
    rpc: Arc<RpcClient>,
    required_chain_id: String,
    keys_path: String,
}

impl WalletConnector {
    pub fn new(rpc: Arc<RpcClient>, required_chain_id: &str, keys_path: &str) -> Self {
        Self {
            rpc,
            required_chain_id: required_chain_id.to_string(),
            keys_path: keys_path.to_string(),
        }
    }

    pub fn required_chain_id(&self) -> &str {
        &self.required_chain_id
    }

    /// Ask the node which chain it serves and compare against the required
    /// chain id. Runs before every connect attempt.
    pub async fn check_network(&self) -> Result<String, Error> {
        let actual = self.rpc.chain_id().await?;
        ensure_chain(&self.required_chain_id, &actual)?;
        Ok(actual)
    }

    /// Create a session on `chain_id`. The caller has already passed the
    /// network guard for that chain.
    pub fn connect(&self, chain_id: String) -> Result<Session, Error> {
        let (account_id, signer) = self.load_signer()?;
        info!(account = %account_id, chain = %chain_id, "Wallet connected");
        Ok(Session {
            account_id,
            chain_id,
            signer,
        })
    }

    /// Key material from `AGGREGATOR_KEYS_JSON`, falling back to the key
    /// file. Neither present means no wallet exists at all.
    fn load_signer(&self) -> Result<(AccountId, Signer), Error> {
        if let Ok(json) = std::env::var("AGGREGATOR_KEYS_JSON") {
            if !json.is_empty() {
                return parse_key_json(&json);
            }
        }
        let json = std::fs::read_to_string(&self.keys_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ProviderAbsent
            } else {
                Error::ConnectionRejected(format!("key file unreadable: {e}"))
            }
        })?;
        parse_key_json(&json)
    }
}

/// Chain guard. Pure so the mismatch path is testable without a node.
pub(crate) fn ensure_chain(required: &str, actual: &str) -> Result<(), Error> {
    if required == actual {
        Ok(())
    } else {
        Err(Error::NetworkMismatch(format!(
            "connected to {actual}, required {required}"
        )))
    }
}

/// Parse key material in the near-cli format, either a single object or an
/// array of them: `{"account_id": "...", "private_key": "..."}`.
fn parse_key_json(json: &str) -> Result<(AccountId, Signer), Error> {
    #[derive(serde::Deserialize)]
    struct KeyFile {
        account_id: String,
        #[serde(alias = "private_key")]
        secret_key: String,
    }

    let rejected = |msg: String| Error::ConnectionRejected(msg);

    let key: KeyFile = if json.trim_start().starts_with('[') {
        let keys: Vec<KeyFile> = serde_json::from_str(json)
            .map_err(|e| rejected(format!("invalid key JSON: {e}")))?;
        keys.into_iter()
            .next()
            .ok_or_else(|| rejected("empty key array".into()))?
    } else {
        serde_json::from_str(json).map_err(|e| rejected(format!("invalid key JSON: {e}")))?
    };

    let account_id: AccountId = key
        .account_id
        .parse()
        .map_err(|e| rejected(format!("invalid account id: {e}")))?;
    let secret_key = SecretKey::from_str(&key.secret_key)
        .map_err(|e| rejected(format!("invalid secret key: {e}")))?;

    Ok((
        account_id.clone(),
        InMemorySigner::from_secret_key(account_id, secret_key),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use near_crypto::KeyType;

    fn sample_secret() -> String {
        SecretKey::from_random(KeyType::ED25519).to_string()
    }

    #[test]
    fn test_ensure_chain_match() {
        assert!(ensure_chain("mainnet", "mainnet").is_ok());
    }

    #[test]
    fn test_ensure_chain_mismatch() {
        let err = ensure_chain("mainnet", "testnet").unwrap_err();
        assert!(matches!(err, Error::NetworkMismatch(_)));
        assert!(err.to_string().contains("testnet"));
        assert!(err.to_string().contains("mainnet"));
    }

    #[test]
    fn test_parse_key_json_object() {
        let json = format!(
            r#"{{"account_id": "holder.testnet", "private_key": "{}"}}"#,
            sample_secret()
        );
        let (account_id, _signer) = parse_key_json(&json).unwrap();
        assert_eq!(account_id.as_str(), "holder.testnet");
    }

    #[test]
    fn test_parse_key_json_array_takes_first() {
        let json = format!(
            r#"[{{"account_id": "a.testnet", "secret_key": "{}"}},
                {{"account_id": "b.testnet", "secret_key": "{}"}}]"#,
            sample_secret(),
            sample_secret()
        );
        let (account_id, _signer) = parse_key_json(&json).unwrap();
        assert_eq!(account_id.as_str(), "a.testnet");
    }

    #[test]
    fn test_parse_key_json_garbage_is_rejected_not_absent() {
        let err = parse_key_json("{nope").unwrap_err();
        assert!(matches!(err, Error::ConnectionRejected(_)));
    }

    #[test]
    fn test_missing_key_file_means_provider_absent() {
        let rpc = Arc::new(RpcClient::new(
            "http://127.0.0.1:1",
            std::time::Duration::from_secs(1),
        ));
        let wallet = WalletConnector::new(rpc, "testnet", "/nonexistent/keys.json");
        // Guard against an ambient AGGREGATOR_KEYS_JSON leaking into the test.
        std::env::remove_var("AGGREGATOR_KEYS_JSON");
        let err = wallet.load_signer().unwrap_err();
        assert!(matches!(err, Error::ProviderAbsent));
    }
}
