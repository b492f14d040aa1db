//! Published vault statistics and user position snapshots.
//!
//! The aggregator is the only writer. Each field is published atomically on
//! its own, so a failed read in the middle of a cycle leaves every other
//! field's previous value visible. Readers always see a complete snapshot.

use crate::Error;
use serde::Serialize;
use std::sync::RwLock;

/// Both contracts report amounts as fixed-point integers scaled by 10^18.
pub const TOKEN_SCALE: f64 = 1e18;

/// Divide a fixed-point contract amount down to a display decimal.
pub fn to_decimal(amount: u128) -> f64 {
    amount as f64 / TOKEN_SCALE
}

/// Aggregate vault statistics, recomputed field by field each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct VaultStats {
    pub total_supply: f64,
    pub total_staked_count: u64,
    /// Token balance held by the vault contract itself.
    pub total_locked_tokens: f64,
    pub early_removed_count: u64,
    pub bonus_pool: f64,
    pub holder_count: u64,
}

/// The connected account's staking position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct UserPosition {
    pub staked_count: u64,
    pub accrued_reward: f64,
    pub unstaked_owned_count: u64,
}

/// Last user-visible advisory (the dashboard banner).
#[derive(Debug, Clone, Serialize)]
pub struct Advisory {
    pub kind: &'static str,
    pub message: String,
}

/// Single-writer snapshot store for everything the presentation layer reads.
#[derive(Default)]
pub struct Published {
    stats: RwLock<VaultStats>,
    position: RwLock<UserPosition>,
    signer_balance: RwLock<f64>,
    advisory: RwLock<Option<Advisory>>,
}

impl Published {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Reads ---

    pub fn stats(&self) -> VaultStats {
        *self.stats.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn position(&self) -> UserPosition {
        *self.position.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn signer_balance(&self) -> f64 {
        *self.signer_balance.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn advisory(&self) -> Option<Advisory> {
        self.advisory
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    // --- Per-field publication ---

    pub fn set_total_supply(&self, v: f64) {
        self.stats.write().unwrap_or_else(|e| e.into_inner()).total_supply = v;
    }

    pub fn set_total_staked_count(&self, v: u64) {
        self.stats
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .total_staked_count = v;
    }

    pub fn set_total_locked_tokens(&self, v: f64) {
        self.stats
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .total_locked_tokens = v;
    }

    pub fn set_early_removed_count(&self, v: u64) {
        self.stats
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .early_removed_count = v;
    }

    pub fn set_bonus_pool(&self, v: f64) {
        self.stats.write().unwrap_or_else(|e| e.into_inner()).bonus_pool = v;
    }

    pub fn set_holder_count(&self, v: u64) {
        self.stats.write().unwrap_or_else(|e| e.into_inner()).holder_count = v;
    }

    /// Staked count and accrued reward come from one activity scan and are
    /// published together.
    pub fn set_staked(&self, count: u64, reward: f64) {
        let mut position = self.position.write().unwrap_or_else(|e| e.into_inner());
        position.staked_count = count;
        position.accrued_reward = reward;
    }

    pub fn set_unstaked_owned_count(&self, v: u64) {
        self.position
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .unstaked_owned_count = v;
    }

    pub fn set_signer_balance(&self, v: f64) {
        *self.signer_balance.write().unwrap_or_else(|e| e.into_inner()) = v;
    }

    // --- Advisories ---

    /// Record an error as the visible advisory banner.
    pub fn advise(&self, err: &Error) {
        *self.advisory.write().unwrap_or_else(|e| e.into_inner()) = Some(Advisory {
            kind: err.kind(),
            message: err.to_string(),
        });
    }

    pub fn clear_advisory(&self) {
        *self.advisory.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    // --- Lifecycle ---

    /// Return every published field to its initial value. Runs before the
    /// fetch sequence replays on an account switch.
    pub fn reset(&self) {
        *self.stats.write().unwrap_or_else(|e| e.into_inner()) = VaultStats::default();
        *self.position.write().unwrap_or_else(|e| e.into_inner()) = UserPosition::default();
        *self.signer_balance.write().unwrap_or_else(|e| e.into_inner()) = 0.0;
        *self.advisory.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_decimal_scales_down() {
        assert_eq!(to_decimal(0), 0.0);
        assert_eq!(to_decimal(1_000_000_000_000_000_000), 1.0);
        assert_eq!(to_decimal(2_500_000_000_000_000_000), 2.5);
    }

    #[test]
    fn test_to_decimal_never_negative() {
        for amount in [0u128, 1, u64::MAX as u128, u128::MAX] {
            assert!(to_decimal(amount) >= 0.0);
        }
    }

    #[test]
    fn test_per_field_publish_keeps_other_fields() {
        let published = Published::new();
        published.set_total_supply(7777.0);
        published.set_holder_count(42);

        // A later field never being written leaves earlier fields intact.
        let stats = published.stats();
        assert_eq!(stats.total_supply, 7777.0);
        assert_eq!(stats.holder_count, 42);
        assert_eq!(stats.bonus_pool, 0.0);

        // Re-publishing one field touches only that field.
        published.set_holder_count(43);
        let stats = published.stats();
        assert_eq!(stats.total_supply, 7777.0);
        assert_eq!(stats.holder_count, 43);
    }

    #[test]
    fn test_publish_is_idempotent() {
        let published = Published::new();
        published.set_total_supply(100.0);
        published.set_staked(3, 1.5);
        let first = (published.stats(), published.position());

        published.set_total_supply(100.0);
        published.set_staked(3, 1.5);
        assert_eq!((published.stats(), published.position()), first);
    }

    #[test]
    fn test_reset_returns_all_fields_to_initial() {
        let published = Published::new();
        published.set_total_supply(9.0);
        published.set_staked(4, 2.0);
        published.set_unstaked_owned_count(6);
        published.set_signer_balance(12.0);
        published.advise(&Error::Rpc("boom".into()));

        published.reset();

        assert_eq!(published.stats(), VaultStats::default());
        assert_eq!(published.position(), UserPosition::default());
        assert_eq!(published.signer_balance(), 0.0);
        assert!(published.advisory().is_none());
    }

    #[test]
    fn test_advise_records_kind_and_message() {
        let published = Published::new();
        published.advise(&Error::Indexer("down".into()));
        let advisory = published.advisory().unwrap();
        assert_eq!(advisory.kind, "indexer");
        assert!(advisory.message.contains("down"));
    }
}
