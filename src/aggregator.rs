//! The aggregation procedure: connect a session, read both contracts,
//! publish statistics.
//!
//! Failure semantics: every step is caught where it fails, logged, and
//! surfaced as an advisory. Fields already published before a failing step
//! stay visible; nothing rolls back and nothing retries within a cycle.

use crate::contracts::{ActivityRecord, ACTION_STAKE};
use crate::metrics::METRICS;
use crate::session::{Session, SessionState, WalletEvent};
use crate::state::AppState;
use crate::stats::to_decimal;
use crate::wallet::ensure_chain;
use crate::Error;
use near_primitives::types::AccountId;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct Aggregator {
    state: Arc<AppState>,
}

impl Aggregator {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// One connect attempt followed by a full fetch cycle.
    ///
    /// `silent` is the startup/auto-connect path: a failed guard or connect
    /// leaves no advisory, deferring to the user-initiated flow.
    pub async fn connect_and_refresh(&self, silent: bool) -> Result<(), Error> {
        METRICS.connect_total.bump();
        let st = &self.state;

        // Network guard: no session and no contract reads on the wrong chain.
        let chain_id = match st.wallet.check_network().await {
            Ok(chain) => chain,
            Err(e) => {
                METRICS.connect_errors.bump();
                warn!(error = %e, "Network guard failed");
                if !silent {
                    st.published.advise(&e);
                }
                st.set_session(SessionState::Disconnected);
                return Err(e);
            }
        };

        st.set_session(SessionState::Connecting);
        let session = match st.wallet.connect(chain_id) {
            Ok(session) => session,
            Err(e) => {
                METRICS.connect_errors.bump();
                warn!(error = %e, "Wallet connect failed");
                if !silent {
                    st.published.advise(&e);
                }
                st.set_session(SessionState::Disconnected);
                return Err(e);
            }
        };

        st.set_session(SessionState::Connected(session.clone()));
        st.published.clear_advisory();

        self.run_cycle(&session).await;
        Ok(())
    }

    /// Re-run the fetch cycle for the existing session.
    pub async fn refresh(&self) -> Result<(), Error> {
        let session = match self.state.session() {
            SessionState::Connected(session) => session,
            _ => return Err(Error::ConnectionRejected("no active session".into())),
        };
        self.run_cycle(&session).await;
        Ok(())
    }

    async fn run_cycle(&self, session: &Session) {
        let _cycle = self.state.cycle_lock.lock().await;
        let start = Instant::now();
        METRICS.refresh_total.bump();

        self.fetch_vault_stats(session).await;
        self.fetch_staked_position(session).await;
        self.fetch_owned_tokens(session).await;

        METRICS.record_cycle_duration(start);
        info!(
            account = %session.account_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Refresh cycle finished"
        );
    }

    /// The aggregate reads plus the signer's own balance. Independent calls
    /// with no cross-field transactional guarantee; values read at slightly
    /// different block heights may skew.
    async fn fetch_vault_stats(&self, session: &Session) {
        let st = &self.state;

        match st.token.balance_of(&session.account_id).await {
            Ok(v) => st.published.set_signer_balance(to_decimal(v)),
            Err(e) => self.step_failed("signer_balance", e),
        }
        match st.token.total_supply().await {
            Ok(v) => st.published.set_total_supply(to_decimal(v)),
            Err(e) => self.step_failed("total_supply", e),
        }
        match st.token.holder_count().await {
            Ok(v) => st.published.set_holder_count(v),
            Err(e) => self.step_failed("holder_count", e),
        }
        match st.vault.early_removed_count().await {
            Ok(v) => st.published.set_early_removed_count(v),
            Err(e) => self.step_failed("early_removed", e),
        }
        match st.token.balance_of(st.vault.contract_id()).await {
            Ok(v) => st.published.set_total_locked_tokens(to_decimal(v)),
            Err(e) => self.step_failed("locked_tokens", e),
        }
        match st.vault.bonus_pool().await {
            Ok(v) => st.published.set_bonus_pool(to_decimal(v)),
            Err(e) => self.step_failed("bonus_pool", e),
        }
        match st.vault.total_staked().await {
            Ok(v) => st.published.set_total_staked_count(v),
            Err(e) => self.step_failed("total_staked", e),
        }
    }

    /// Scan the signer's activity log and tally staked entries. Bounded by
    /// the configured cap. A mid-scan failure abandons the whole step, so
    /// the previously published tally stays visible.
    async fn fetch_staked_position(&self, session: &Session) {
        let st = &self.state;
        let count = match st.vault.activity_count(&session.account_id).await {
            Ok(count) => count,
            Err(e) => return self.step_failed("activity_count", e),
        };
        if count == 0 {
            return;
        }

        let limit = st.config.activity_scan_limit;
        let scan = count.min(limit);
        if count > limit {
            METRICS.scan_truncations.bump();
            warn!(
                account = %session.account_id,
                count,
                limit,
                "Activity log truncated at scan cap"
            );
        }

        let mut records = Vec::with_capacity(scan as usize);
        for index in 0..scan {
            match st.vault.activity(&session.account_id, index).await {
                Ok(record) => records.push(record),
                Err(e) => return self.step_failed("activity_scan", e),
            }
        }

        match tally_staked(&records) {
            Ok(tally) => st
                .published
                .set_staked(tally.staked_count, to_decimal(tally.reward_total)),
            Err(e) => self.step_failed("activity_tally", e),
        }
    }

    async fn fetch_owned_tokens(&self, session: &Session) {
        match self.state.indexer.tokens_owned(&session.account_id).await {
            Ok(total) => self.state.published.set_unstaked_owned_count(total),
            Err(e) => self.step_failed("owned_tokens", e),
        }
    }

    fn step_failed(&self, step: &'static str, err: Error) {
        METRICS.refresh_errors.bump();
        warn!(step, error = %err, "Fetch step failed");
        self.state.published.advise(&err);
    }

    // --- Wallet events ---

    /// Drive provider-level wallet notifications until cancelled.
    pub async fn run_event_loop(
        &self,
        mut events: mpsc::Receiver<WalletEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(WalletEvent::AccountsChanged(account_id)) => {
                        self.on_accounts_changed(&account_id).await;
                    }
                    Some(WalletEvent::ChainChanged(chain_id)) => {
                        self.on_chain_changed(&chain_id).await;
                    }
                    None => break,
                },
            }
        }
        info!("Wallet event loop stopped");
    }

    /// Account switch: every published field returns to its initial value
    /// and the session drops before the connect-and-fetch sequence replays.
    pub async fn on_accounts_changed(&self, account_id: &AccountId) {
        info!(account = %account_id, "Account changed, resetting state");
        self.state.published.reset();
        self.state.set_session(SessionState::Disconnected);
        let _ = self.connect_and_refresh(true).await;
    }

    /// Chain switch: reconnect when the new chain is the required one,
    /// drop the session otherwise.
    pub async fn on_chain_changed(&self, chain_id: &str) {
        match ensure_chain(self.state.wallet.required_chain_id(), chain_id) {
            Ok(()) => {
                info!(chain = chain_id, "Chain changed to required network, reconnecting");
                let _ = self.connect_and_refresh(false).await;
            }
            Err(err) => {
                warn!(chain = chain_id, "Chain changed away from required network");
                self.state.set_session(SessionState::Disconnected);
                self.state.published.advise(&err);
            }
        }
    }
}

/// Tally of one activity scan.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct StakeTally {
    pub staked_count: u64,
    pub reward_total: u128,
}

/// Count entries whose action is STAKE and sum their rewards.
///
/// Entries are counted raw: a later UNSTAKE does not subtract its earlier
/// STAKE, so the count can overstate live positions. Downstream consumers
/// depend on the raw figure.
pub(crate) fn tally_staked(records: &[ActivityRecord]) -> Result<StakeTally, Error> {
    let mut tally = StakeTally {
        staked_count: 0,
        reward_total: 0,
    };
    for record in records {
        if record.action == ACTION_STAKE {
            tally.staked_count += 1;
            tally.reward_total = tally.reward_total.saturating_add(record.reward_amount()?);
        }
    }
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::ACTION_UNSTAKE;
    use crate::state::tests::make_test_state;
    use crate::stats::VaultStats;

    fn record(action: u8, reward: &str) -> ActivityRecord {
        ActivityRecord {
            action,
            reward: reward.into(),
        }
    }

    #[test]
    fn test_tally_counts_raw_stake_actions() {
        // Two stakes and one unstake tally as 2: unstakes are not netted out.
        let records = vec![
            record(ACTION_STAKE, "1000000000000000000"),
            record(ACTION_STAKE, "500000000000000000"),
            record(ACTION_UNSTAKE, "0"),
        ];
        let tally = tally_staked(&records).unwrap();
        assert_eq!(tally.staked_count, 2);
        assert_eq!(tally.reward_total, 1_500_000_000_000_000_000);
    }

    #[test]
    fn test_tally_empty_log() {
        let tally = tally_staked(&[]).unwrap();
        assert_eq!(
            tally,
            StakeTally {
                staked_count: 0,
                reward_total: 0
            }
        );
    }

    #[test]
    fn test_tally_ignores_unstake_rewards() {
        // Reward strings on non-stake entries are never parsed.
        let records = vec![
            record(ACTION_UNSTAKE, "garbage"),
            record(ACTION_STAKE, "1"),
        ];
        let tally = tally_staked(&records).unwrap();
        assert_eq!(tally.staked_count, 1);
        assert_eq!(tally.reward_total, 1);
    }

    #[test]
    fn test_tally_malformed_stake_reward_errors() {
        let records = vec![record(ACTION_STAKE, "not-a-number")];
        assert!(tally_staked(&records).is_err());
    }

    #[tokio::test]
    async fn test_failed_guard_leaves_no_session_and_no_publishes() {
        // The RPC endpoint is unroutable, so the network guard fails before
        // any session exists or any contract read is attempted.
        let state = make_test_state();
        let aggregator = Aggregator::new(Arc::clone(&state));

        let result = aggregator.connect_and_refresh(true).await;
        assert!(result.is_err());
        assert!(!state.session().is_connected());
        assert_eq!(state.published.stats(), VaultStats::default());
        // Silent path: no advisory either.
        assert!(state.published.advisory().is_none());
    }

    #[tokio::test]
    async fn test_user_initiated_guard_failure_sets_advisory() {
        let state = make_test_state();
        let aggregator = Aggregator::new(Arc::clone(&state));

        assert!(aggregator.connect_and_refresh(false).await.is_err());
        assert!(state.published.advisory().is_some());
        assert!(!state.session().is_connected());
    }

    #[tokio::test]
    async fn test_refresh_without_session_is_rejected() {
        let state = make_test_state();
        let aggregator = Aggregator::new(Arc::clone(&state));

        let err = aggregator.refresh().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionRejected(_)));
    }

    #[tokio::test]
    async fn test_accounts_changed_resets_published_state() {
        let state = make_test_state();
        let aggregator = Aggregator::new(Arc::clone(&state));

        // Seed a previous account's view of the world.
        state.published.set_total_supply(1234.0);
        state.published.set_staked(5, 9.5);
        state.published.set_signer_balance(3.0);

        let switched: AccountId = "other.testnet".parse().unwrap();
        aggregator.on_accounts_changed(&switched).await;

        // The replayed connect fails against the unroutable endpoint, so
        // everything must still be at its initial value.
        assert_eq!(state.published.stats(), VaultStats::default());
        assert_eq!(state.published.position().staked_count, 0);
        assert_eq!(state.published.signer_balance(), 0.0);
        assert!(!state.session().is_connected());
    }

    #[tokio::test]
    async fn test_chain_changed_to_wrong_network_drops_session() {
        let state = make_test_state();
        let aggregator = Aggregator::new(Arc::clone(&state));

        aggregator.on_chain_changed("mainnet").await;

        assert!(!state.session().is_connected());
        let advisory = state.published.advisory().unwrap();
        assert_eq!(advisory.kind, "network_mismatch");
    }
}
