//! Wallet session lifecycle.
//!
//! Exactly one session exists per service instance. It is owned by the
//! application state and created/destroyed only by the aggregator; there is
//! no ambient wallet handle.

use near_crypto::Signer;
use near_primitives::types::AccountId;

/// A live wallet session: the connected address plus its signing capability.
#[derive(Clone)]
pub struct Session {
    pub account_id: AccountId,
    /// Chain the session was validated against at connect time.
    pub chain_id: String,
    pub signer: Signer,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("Session")
            .field("account_id", &self.account_id)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

/// Connection lifecycle: `Disconnected -> Connecting -> Connected`, back to
/// `Disconnected` on chain mismatch or account switch.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(Session),
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SessionState::Connected(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Connected(session) => Some(session),
            _ => None,
        }
    }

    pub fn account_id(&self) -> Option<&AccountId> {
        self.session().map(|s| &s.account_id)
    }

    /// Human-readable state label for health reporting.
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected(_) => "connected",
        }
    }
}

/// Provider-level wallet notifications.
#[derive(Debug, Clone)]
pub enum WalletEvent {
    /// The active account changed. Published state fully resets, then the
    /// connect-and-fetch sequence replays.
    AccountsChanged(AccountId),
    /// The active chain changed. Re-validated against the required chain;
    /// a mismatch drops the session.
    ChainChanged(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use near_crypto::{InMemorySigner, KeyType, SecretKey};

    fn make_session(account: &str) -> Session {
        let secret = SecretKey::from_random(KeyType::ED25519);
        let account_id: AccountId = account.parse().unwrap();
        Session {
            signer: InMemorySigner::from_secret_key(account_id.clone(), secret),
            account_id,
            chain_id: "testnet".into(),
        }
    }

    #[test]
    fn test_default_is_disconnected() {
        let state = SessionState::default();
        assert!(!state.is_connected());
        assert_eq!(state.label(), "disconnected");
        assert!(state.account_id().is_none());
    }

    #[test]
    fn test_connected_exposes_session() {
        let state = SessionState::Connected(make_session("holder.testnet"));
        assert!(state.is_connected());
        assert_eq!(state.label(), "connected");
        assert_eq!(state.account_id().unwrap().as_str(), "holder.testnet");
    }

    #[test]
    fn test_connecting_is_not_connected() {
        let state = SessionState::Connecting;
        assert!(!state.is_connected());
        assert_eq!(state.label(), "connecting");
    }

    #[test]
    fn test_session_debug_hides_signer() {
        let session = make_session("holder.testnet");
        let rendered = format!("{session:?}");
        assert!(rendered.contains("holder.testnet"));
        assert!(!rendered.contains("ed25519:"));
    }
}
