//! Proposal-scoped memoization of voting power.
//!
//! Tallying a proposal reads the same accounts repeatedly; the cache keeps
//! one weight per (proposal, account) pair and drops entries whenever the
//! ledger reports that the account's position changed.

use crate::power::StakeReader;
use std::collections::HashMap;
use stakenet_staking::LedgerEvent;
use stakenet_types::{Address, Wei};
use tracing::trace;

pub type ProposalId = u64;

/// Lazy per-proposal voting-power cache.
#[derive(Debug, Default)]
pub struct VotingPowerCache {
    entries: HashMap<(ProposalId, Address), Wei>,
}

impl VotingPowerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The account's weight for the proposal, computed through `reader` on
    /// first use and memoized afterwards.
    pub fn voting_power(
        &mut self,
        reader: &impl StakeReader,
        proposal: ProposalId,
        account: Address,
    ) -> Wei {
        *self
            .entries
            .entry((proposal, account))
            .or_insert_with(|| reader.account_voting_power(&account))
    }

    /// Apply a batch of drained ledger events, evicting every cached weight
    /// of each touched account across all proposals.
    pub fn apply_events(&mut self, events: &[LedgerEvent]) {
        for event in events {
            let account = match event {
                LedgerEvent::VoterDataRefreshed { account }
                | LedgerEvent::VoterRecalculated { account } => *account,
            };
            self.entries.retain(|(_, cached), _| *cached != account);
            trace!(target: "governance", "evicted cached voting power of {}", account);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPower(HashMap<Address, Wei>);

    impl StakeReader for FixedPower {
        fn account_voting_power(&self, account: &Address) -> Wei {
            self.0.get(account).copied().unwrap_or(0)
        }
    }

    fn addr(n: u8) -> Address {
        Address([n; stakenet_types::ADDRESS_BYTES])
    }

    #[test]
    fn memoizes_until_invalidated() {
        let mut reader = FixedPower(HashMap::from([(addr(1), 100)]));
        let mut cache = VotingPowerCache::new();

        assert_eq!(cache.voting_power(&reader, 7, addr(1)), 100);
        reader.0.insert(addr(1), 250);
        // stale until the ledger says otherwise
        assert_eq!(cache.voting_power(&reader, 7, addr(1)), 100);

        cache.apply_events(&[LedgerEvent::VoterDataRefreshed { account: addr(1) }]);
        assert_eq!(cache.voting_power(&reader, 7, addr(1)), 250);
    }

    #[test]
    fn eviction_spans_proposals_but_not_accounts() {
        let reader = FixedPower(HashMap::from([(addr(1), 100), (addr(2), 50)]));
        let mut cache = VotingPowerCache::new();
        cache.voting_power(&reader, 1, addr(1));
        cache.voting_power(&reader, 2, addr(1));
        cache.voting_power(&reader, 1, addr(2));
        assert_eq!(cache.len(), 3);

        cache.apply_events(&[LedgerEvent::VoterRecalculated { account: addr(1) }]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.voting_power(&reader, 1, addr(2)), 50);
    }
}
