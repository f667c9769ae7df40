//! Per-account voting power.

use stakenet_staking::StakingLedger;
use stakenet_types::{Address, Wei};

/// Read-only view of an account's governance weight.
///
/// Implemented by the staking ledger; governance code depends on this trait
/// so tallies can be tested against fixed weight tables.
pub trait StakeReader {
    /// Bonded wei backing the account's vote right now.
    fn account_voting_power(&self, account: &Address) -> Wei;
}

impl StakeReader for StakingLedger {
    /// A validator votes with its self-stake plus everything delegated to
    /// it; a depositor votes with its own delegation on top of that.
    /// Deactivated or slashed positions contribute nothing.
    fn account_voting_power(&self, account: &Address) -> Wei {
        let mut power = 0;
        if let Some(staker) = self.staker_id_of(account).and_then(|id| self.staker(id)) {
            if staker.is_active() && !staker.is_cheater {
                power += staker.stake_amount + staker.delegated_me;
            }
        }
        if let Some(delegation) = self.delegation(account) {
            if delegation.is_active() && !self.is_cheater(delegation.to_staker_id) {
                power += delegation.amount;
            }
        }
        power
    }
}
