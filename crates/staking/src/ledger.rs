//! The aggregate root owning all staking state.

use crate::epoch::EpochSnapshot;
use crate::errors::StakingError;
use crate::params::EconomicParams;
use crate::records::{Delegation, Staker, WithdrawalRequest};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use stakenet_types::{ratio_from_parts, Address, EpochId, Ratio, StakerId, Wei};

/// Notification that a ledger mutation invalidated cached voting power.
///
/// Drained by the governance layer through [`StakingLedger::take_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// The account's stake or delegation balance changed.
    VoterDataRefreshed { account: Address },
    /// The account's voting power must be recomputed from scratch
    /// (deactivation, slashing, withdrawal).
    VoterRecalculated { account: Address },
}

/// The staking, delegation and epoch-reward ledger.
///
/// Single-threaded and transactional: each operation validates every
/// precondition before its first state write, so failures leave the ledger
/// untouched. Epoch advancement and wall-clock time are explicit inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakingLedger {
    pub(crate) params: EconomicParams,
    pub(crate) owner: Address,

    pub(crate) current_sealed_epoch: EpochId,
    pub(crate) snapshots: BTreeMap<EpochId, EpochSnapshot>,

    pub(crate) stakers: BTreeMap<StakerId, Staker>,
    pub(crate) staker_ids: HashMap<Address, StakerId>,
    pub(crate) stakers_last_id: StakerId,
    pub(crate) stakers_num: u64,

    pub(crate) delegations: HashMap<Address, Delegation>,
    pub(crate) delegations_num: u64,

    pub(crate) stake_total_amount: Wei,
    pub(crate) delegations_total_amount: Wei,
    pub(crate) slashed_stake_total_amount: Wei,
    pub(crate) slashed_delegations_total_amount: Wei,

    /// Zero while the lockup feature is inactive.
    pub(crate) first_locked_up_epoch: EpochId,
    pub(crate) total_burnt_lockup_rewards: Wei,
    pub(crate) forfeited_penalties_total: Wei,
    pub(crate) early_withdrawal_penalties: HashMap<Address, Wei>,

    pub(crate) withdrawal_requests: HashMap<Address, BTreeMap<u64, WithdrawalRequest>>,

    /// Survives staker record removal so slashed funds stay diverted.
    pub(crate) cheaters: HashSet<StakerId>,

    pub(crate) total_supply: Wei,
    pub(crate) events: Vec<LedgerEvent>,
}

impl StakingLedger {
    /// Create an empty ledger owned by `owner`.
    pub fn new(
        owner: Address,
        params: EconomicParams,
        total_supply: Wei,
    ) -> Result<Self, StakingError> {
        params.validate()?;
        Ok(Self {
            params,
            owner,
            current_sealed_epoch: 0,
            snapshots: BTreeMap::new(),
            stakers: BTreeMap::new(),
            staker_ids: HashMap::new(),
            stakers_last_id: 0,
            stakers_num: 0,
            delegations: HashMap::new(),
            delegations_num: 0,
            stake_total_amount: 0,
            delegations_total_amount: 0,
            slashed_stake_total_amount: 0,
            slashed_delegations_total_amount: 0,
            first_locked_up_epoch: 0,
            total_burnt_lockup_rewards: 0,
            forfeited_penalties_total: 0,
            early_withdrawal_penalties: HashMap::new(),
            withdrawal_requests: HashMap::new(),
            cheaters: HashSet::new(),
            total_supply,
            events: Vec::new(),
        })
    }

    // --- read-only surface ---

    pub fn params(&self) -> &EconomicParams {
        &self.params
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// The most recently sealed epoch (0 = genesis, nothing sealed yet).
    pub fn current_sealed_epoch(&self) -> EpochId {
        self.current_sealed_epoch
    }

    /// The epoch currently in progress.
    pub fn current_epoch(&self) -> EpochId {
        self.current_sealed_epoch + 1
    }

    pub fn stakers_num(&self) -> u64 {
        self.stakers_num
    }

    /// Highest staker id ever assigned; ids are never reused.
    pub fn stakers_last_id(&self) -> StakerId {
        self.stakers_last_id
    }

    pub fn stake_total_amount(&self) -> Wei {
        self.stake_total_amount
    }

    pub fn delegations_num(&self) -> u64 {
        self.delegations_num
    }

    pub fn delegations_total_amount(&self) -> Wei {
        self.delegations_total_amount
    }

    pub fn slashed_stake_total_amount(&self) -> Wei {
        self.slashed_stake_total_amount
    }

    pub fn slashed_delegations_total_amount(&self) -> Wei {
        self.slashed_delegations_total_amount
    }

    pub fn total_burnt_lockup_rewards(&self) -> Wei {
        self.total_burnt_lockup_rewards
    }

    /// Penalties withheld from early delegation exits, retained by the ledger.
    pub fn forfeited_penalties_total(&self) -> Wei {
        self.forfeited_penalties_total
    }

    pub fn first_locked_up_epoch(&self) -> EpochId {
        self.first_locked_up_epoch
    }

    pub fn total_supply(&self) -> Wei {
        self.total_supply
    }

    /// Update the circulating supply used for bonded-ratio snapshots.
    pub fn set_total_supply(&mut self, total_supply: Wei) {
        self.total_supply = total_supply;
    }

    /// Fraction of the total supply currently bonded, parts-per-`RATIO_UNIT`.
    pub fn bonded_ratio(&self) -> Ratio {
        ratio_from_parts(
            self.stake_total_amount + self.delegations_total_amount,
            self.total_supply,
        )
    }

    pub fn staker(&self, id: StakerId) -> Option<&Staker> {
        self.stakers.get(&id)
    }

    pub fn staker_id_of(&self, owner: &Address) -> Option<StakerId> {
        self.staker_ids.get(owner).copied()
    }

    pub fn delegation(&self, depositor: &Address) -> Option<&Delegation> {
        self.delegations.get(depositor)
    }

    pub fn withdrawal_request(&self, account: &Address, wr_id: u64) -> Option<&WithdrawalRequest> {
        self.withdrawal_requests
            .get(account)
            .and_then(|reqs| reqs.get(&wr_id))
    }

    /// Drain the pending voting-power notifications.
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    // --- shared internals ---

    pub(crate) fn emit_refreshed(&mut self, account: Address) {
        self.events.push(LedgerEvent::VoterDataRefreshed { account });
    }

    pub(crate) fn emit_recalculated(&mut self, account: Address) {
        self.events.push(LedgerEvent::VoterRecalculated { account });
    }

    pub(crate) fn require_owner(&self, caller: &Address) -> Result<(), StakingError> {
        if *caller != self.owner {
            return Err(StakingError::NotOwner);
        }
        Ok(())
    }

    /// Look up the caller's staker id, failing when none exists.
    pub(crate) fn staker_id_by_owner(&self, owner: &Address) -> Result<StakerId, StakingError> {
        self.staker_ids
            .get(owner)
            .copied()
            .ok_or(StakingError::StakerNotFound)
    }

    pub(crate) fn staker_ref(&self, id: StakerId) -> Result<&Staker, StakingError> {
        self.stakers.get(&id).ok_or(StakingError::StakerNotFound)
    }

    pub(crate) fn active_staker_ref(&self, id: StakerId) -> Result<&Staker, StakingError> {
        let staker = self.staker_ref(id)?;
        if !staker.is_active() {
            return Err(StakingError::StakerDeactivated);
        }
        Ok(staker)
    }

    pub(crate) fn delegation_ref(&self, depositor: &Address) -> Result<&Delegation, StakingError> {
        self.delegations
            .get(depositor)
            .ok_or(StakingError::DelegationNotFound)
    }

    pub(crate) fn active_delegation_ref(
        &self,
        depositor: &Address,
    ) -> Result<&Delegation, StakingError> {
        let delegation = self.delegation_ref(depositor)?;
        if !delegation.is_active() {
            return Err(StakingError::DelegationDeactivated);
        }
        Ok(delegation)
    }
}
