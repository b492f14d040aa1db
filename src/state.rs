//! Application state shared across handlers.

use crate::config::Config;
use crate::contracts::{TokenContract, VaultContract};
use crate::indexer::IndexerClient;
use crate::rpc::RpcClient;
use crate::session::{SessionState, WalletEvent};
use crate::stats::Published;
use crate::wallet::WalletConnector;
use crate::Error;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex as AsyncMutex};

/// Shared application state. The session slot and published store are
/// single-writer: only the aggregator mutates them.
pub struct AppState {
    pub config: Config,
    pub rpc: Arc<RpcClient>,
    pub token: TokenContract,
    pub vault: VaultContract,
    pub indexer: IndexerClient,
    pub wallet: WalletConnector,
    pub published: Published,
    session: RwLock<SessionState>,
    /// Serializes refresh cycles so two triggers never interleave writes.
    pub cycle_lock: AsyncMutex<()>,
    pub wallet_events: mpsc::Sender<WalletEvent>,
    pub start_time: Instant,
    pub request_count: AtomicU64,
}

impl AppState {
    pub fn new(config: Config, wallet_events: mpsc::Sender<WalletEvent>) -> Result<Self, Error> {
        let vault_id = config
            .vault_contract_id
            .parse()
            .map_err(|e| Error::Config(format!("vault contract id: {e}")))?;
        let token_id = config
            .token_contract_id
            .parse()
            .map_err(|e| Error::Config(format!("token contract id: {e}")))?;

        let timeout = Duration::from_secs(config.rpc_timeout_secs);
        let rpc = Arc::new(RpcClient::new(&config.rpc_url, timeout));

        let indexer_api_key = std::env::var("AGGREGATOR_INDEXER_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        let indexer = IndexerClient::new(
            &config.indexer_url,
            &config.chain_id,
            indexer_api_key,
            timeout,
        )?;

        Ok(Self {
            token: TokenContract::new(Arc::clone(&rpc), token_id),
            vault: VaultContract::new(Arc::clone(&rpc), vault_id),
            indexer,
            wallet: WalletConnector::new(Arc::clone(&rpc), &config.chain_id, &config.keys_path),
            rpc,
            published: Published::new(),
            session: RwLock::new(SessionState::Disconnected),
            cycle_lock: AsyncMutex::new(()),
            wallet_events,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            config,
        })
    }

    pub fn session(&self) -> SessionState {
        self.session.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_session(&self, state: SessionState) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// State over unroutable endpoints, for tests that never reach the wire.
    pub(crate) fn make_test_state() -> Arc<AppState> {
        let config = Config {
            chain_id: "testnet".into(),
            rpc_url: "http://127.0.0.1:1".into(),
            vault_contract_id: "vault.dusty.testnet".into(),
            token_contract_id: "token.dusty.testnet".into(),
            indexer_url: "http://127.0.0.1:2".into(),
            keys_path: "/nonexistent/keys.json".into(),
            bind_address: "127.0.0.1:0".into(),
            rpc_timeout_secs: 1,
            activity_scan_limit: 10,
        };
        let (tx, _rx) = mpsc::channel(8);
        Arc::new(AppState::new(config, tx).unwrap())
    }

    #[test]
    fn test_state_starts_disconnected() {
        let state = make_test_state();
        assert!(!state.session().is_connected());
        assert_eq!(state.published.stats(), crate::stats::VaultStats::default());
    }

    #[test]
    fn test_bad_contract_id_is_config_error() {
        let config = Config {
            vault_contract_id: "NOT a valid account!".into(),
            ..Config::default()
        };
        let (tx, _rx) = mpsc::channel(8);
        assert!(matches!(
            AppState::new(config, tx),
            Err(Error::Config(_))
        ));
    }
}
