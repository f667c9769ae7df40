//! Epoch reward accrual and claiming.
//!
//! Rewards are computed lazily from sealed epoch snapshots. Every account
//! carries a `paid_until_epoch` watermark; a claim walks the sealed epochs
//! past the watermark, splits each epoch's reward through the lockup rules
//! and advances the watermark. Nothing is owed for an epoch an account was
//! absent from its snapshot.

use crate::errors::StakingError;
use crate::ledger::StakingLedger;
use crate::math::{apply_ratio, mul_div};
use crate::records::{Delegation, RewardSplit, Staker, Transfer};
use serde::{Deserialize, Serialize};
use stakenet_types::{Address, EpochId, Ratio, StakerId, Wei, RATIO_UNIT};
use tracing::{debug, info};

/// Outcome of a (prospective) claim over a contiguous epoch range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimPreview {
    /// Wei the claim pays out.
    pub amount: Wei,
    /// Wei withheld because the account was unlocked while the lockup
    /// feature was active.
    pub burnt: Wei,
    pub from_epoch: EpochId,
    pub until_epoch: EpochId,
}

impl StakingLedger {
    /// Reward the whole validator entity (self-stake plus delegations)
    /// earned in one sealed epoch, before the commission split.
    pub fn calc_raw_validator_epoch_reward(&self, staker_id: StakerId, epoch: EpochId) -> Wei {
        let Some(snapshot) = self.snapshots.get(&epoch) else {
            return 0;
        };
        let Some(weight) = snapshot.validators.get(&staker_id) else {
            return 0;
        };
        let total_weight = snapshot.total_weight();
        if total_weight == 0 {
            return 0;
        }
        mul_div(snapshot.epoch_reward, weight.total(), total_weight)
    }

    /// The validator's own share for one epoch: its self-stake weight plus
    /// commission on the delegated weight.
    ///
    /// Reports what a claim of just this epoch would pay, so once the
    /// lockup feature covers the epoch an unlocked staker sees only the
    /// `unlocked_reward_ratio` fraction.
    pub fn calc_validator_epoch_reward(
        &self,
        staker_id: StakerId,
        epoch: EpochId,
        commission: Ratio,
    ) -> Wei {
        let full = self.full_validator_epoch_reward(staker_id, epoch, commission);
        let lockup = self.stakers.get(&staker_id).and_then(|staker| staker.lockup);
        self.split_epoch_reward(full, epoch, lockup).payable()
    }

    /// A delegation's share for one epoch: its amount weighted at one minus
    /// the validator commission, reduced by the depositor's lock state the
    /// same way [`calc_validator_epoch_reward`](Self::calc_validator_epoch_reward)
    /// is.
    pub fn calc_delegation_epoch_reward(
        &self,
        depositor: &Address,
        staker_id: StakerId,
        epoch: EpochId,
        amount: Wei,
        commission: Ratio,
    ) -> Wei {
        let full = self.full_delegation_epoch_reward(staker_id, epoch, amount, commission);
        let lockup = self
            .delegations
            .get(depositor)
            .and_then(|delegation| delegation.lockup);
        self.split_epoch_reward(full, epoch, lockup).payable()
    }

    /// Pre-split validator share, fed into the lockup split by claims and
    /// the per-epoch calculator alike.
    pub(crate) fn full_validator_epoch_reward(
        &self,
        staker_id: StakerId,
        epoch: EpochId,
        commission: Ratio,
    ) -> Wei {
        let raw = self.calc_raw_validator_epoch_reward(staker_id, epoch);
        if raw == 0 {
            return 0;
        }
        let weight = &self.snapshots[&epoch].validators[&staker_id];
        let commission_weight = weight.stake_amount + apply_ratio(weight.delegated_me, commission);
        mul_div(raw, commission_weight, weight.total())
    }

    /// Pre-split delegation share.
    pub(crate) fn full_delegation_epoch_reward(
        &self,
        staker_id: StakerId,
        epoch: EpochId,
        amount: Wei,
        commission: Ratio,
    ) -> Wei {
        let raw = self.calc_raw_validator_epoch_reward(staker_id, epoch);
        if raw == 0 {
            return 0;
        }
        let weight = &self.snapshots[&epoch].validators[&staker_id];
        let delegation_weight = apply_ratio(amount, RATIO_UNIT - commission);
        mul_div(raw, delegation_weight, weight.total())
    }

    /// Preview a validator claim without mutating anything.
    ///
    /// `from_epoch` of 0 means "continue from the watermark"; `max_epochs`
    /// bounds the range so claims stay cheap over long idle periods.
    pub fn calc_validator_rewards(
        &self,
        staker_id: StakerId,
        from_epoch: EpochId,
        max_epochs: u64,
    ) -> Result<ClaimPreview, StakingError> {
        let staker = self.staker_ref(staker_id)?;
        let (from, until) = self.claim_range(staker.paid_until_epoch, from_epoch, max_epochs)?;
        let split = self.sum_validator_split(staker, from, until);
        Ok(ClaimPreview {
            amount: split.payable(),
            burnt: split.burnt,
            from_epoch: from,
            until_epoch: until,
        })
    }

    /// Preview a delegation claim without mutating anything.
    pub fn calc_delegation_rewards(
        &self,
        depositor: &Address,
        from_epoch: EpochId,
        max_epochs: u64,
    ) -> Result<ClaimPreview, StakingError> {
        let delegation = self.delegation_ref(depositor)?;
        let (from, until) = self.claim_range(delegation.paid_until_epoch, from_epoch, max_epochs)?;
        let (split, _) = self.sum_delegation_split(delegation, from, until);
        Ok(ClaimPreview {
            amount: split.payable(),
            burnt: split.burnt,
            from_epoch: from,
            until_epoch: until,
        })
    }

    /// Claim the caller's validator rewards for up to `max_epochs` sealed
    /// epochs past the watermark.
    pub fn claim_validator_rewards(
        &mut self,
        caller: Address,
        max_epochs: u64,
    ) -> Result<Transfer, StakingError> {
        let (staker_id, split, until) = self.settle_validator_rewards(&caller, max_epochs)?;
        let payable = split.payable();
        self.emit_refreshed(caller);
        info!(
            target: "staking",
            "staker {} claimed {} wei through epoch {} ({} burnt)",
            staker_id, payable, until, split.burnt
        );
        Ok(Transfer {
            to: caller,
            amount: payable,
        })
    }

    /// Claim validator rewards and fold them back into the self-stake
    /// instead of paying them out.
    pub fn claim_validator_compound_rewards(
        &mut self,
        caller: Address,
        max_epochs: u64,
    ) -> Result<(), StakingError> {
        let (staker_id, split, until) = self.settle_validator_rewards(&caller, max_epochs)?;
        let payable = split.payable();
        let staker = self.stakers.get_mut(&staker_id).expect("settled above");
        staker.stake_amount += payable;
        self.stake_total_amount += payable;
        self.emit_refreshed(caller);
        info!(
            target: "staking",
            "staker {} compounded {} wei through epoch {}", staker_id, payable, until
        );
        Ok(())
    }

    /// Claim the caller's delegation rewards for up to `max_epochs` sealed
    /// epochs past the watermark.
    ///
    /// Epochs covered by an active lockup also accrue into the caller's
    /// early-withdrawal penalty accumulator.
    pub fn claim_delegation_rewards(
        &mut self,
        caller: Address,
        max_epochs: u64,
        staker_id: StakerId,
    ) -> Result<Transfer, StakingError> {
        let (split, until) = self.settle_delegation_rewards(&caller, max_epochs, staker_id)?;
        let payable = split.payable();
        self.emit_refreshed(caller);
        info!(
            target: "staking",
            "{} claimed {} wei of delegation rewards through epoch {} ({} burnt)",
            caller, payable, until, split.burnt
        );
        Ok(Transfer {
            to: caller,
            amount: payable,
        })
    }

    /// Claim delegation rewards and fold them back into the delegation.
    ///
    /// Compounded rewards are not new outside funds, so the delegated-stake
    /// ceiling is not re-checked here.
    pub fn claim_delegation_compound_rewards(
        &mut self,
        caller: Address,
        max_epochs: u64,
        staker_id: StakerId,
    ) -> Result<(), StakingError> {
        let (split, until) = self.settle_delegation_rewards(&caller, max_epochs, staker_id)?;
        let payable = split.payable();
        let delegation = self.delegations.get_mut(&caller).expect("settled above");
        delegation.amount += payable;
        self.delegations_total_amount += payable;
        if let Some(staker) = self.stakers.get_mut(&staker_id) {
            staker.delegated_me += payable;
            let staker_owner = staker.owner;
            self.emit_refreshed(staker_owner);
        }
        self.emit_refreshed(caller);
        info!(
            target: "staking",
            "{} compounded {} wei into delegation through epoch {}", caller, payable, until
        );
        Ok(())
    }

    /// Forfeit all unclaimed validator rewards, advancing the watermark to
    /// the current sealed epoch without paying anything.
    pub fn discard_validator_rewards(&mut self, caller: Address) -> Result<(), StakingError> {
        let staker_id = self.staker_id_by_owner(&caller)?;
        let sealed = self.current_sealed_epoch;
        self.stakers
            .get_mut(&staker_id)
            .expect("id is indexed")
            .paid_until_epoch = sealed;
        debug!(target: "staking", "staker {} discarded rewards through epoch {}", staker_id, sealed);
        Ok(())
    }

    /// Forfeit all unclaimed delegation rewards.
    pub fn discard_delegation_rewards(
        &mut self,
        caller: Address,
        staker_id: StakerId,
    ) -> Result<(), StakingError> {
        let delegation = self.delegation_ref(&caller)?;
        if delegation.to_staker_id != staker_id {
            return Err(StakingError::DelegationNotFound);
        }
        let sealed = self.current_sealed_epoch;
        self.delegations
            .get_mut(&caller)
            .expect("checked above")
            .paid_until_epoch = sealed;
        debug!(target: "staking", "{} discarded delegation rewards through epoch {}", caller, sealed);
        Ok(())
    }

    // --- internals ---

    /// Resolve the epoch range of a claim. A `from_epoch` of 0 continues
    /// from the watermark; an explicit epoch must not revisit settled ones.
    pub(crate) fn claim_range(
        &self,
        paid_until: EpochId,
        from_epoch: EpochId,
        max_epochs: u64,
    ) -> Result<(EpochId, EpochId), StakingError> {
        if max_epochs == 0 {
            return Err(StakingError::InvalidEpochRange);
        }
        let from = if from_epoch == 0 {
            paid_until + 1
        } else {
            if from_epoch <= paid_until {
                return Err(StakingError::InvalidEpochRange);
            }
            from_epoch
        };
        if from > self.current_sealed_epoch {
            return Err(StakingError::FutureEpoch(from));
        }
        let until = self
            .current_sealed_epoch
            .min(from.saturating_add(max_epochs - 1));
        Ok((from, until))
    }

    pub(crate) fn sum_validator_split(
        &self,
        staker: &Staker,
        from: EpochId,
        until: EpochId,
    ) -> RewardSplit {
        let commission = self.params.validator_commission;
        let mut split = RewardSplit::default();
        for epoch in from..=until {
            let full = self.full_validator_epoch_reward(staker.id, epoch, commission);
            split.accumulate(self.split_epoch_reward(full, epoch, staker.lockup));
        }
        split
    }

    /// Sums the delegation's split over the range and, separately, the
    /// penalty accrued by the locked epochs inside it.
    pub(crate) fn sum_delegation_split(
        &self,
        delegation: &Delegation,
        from: EpochId,
        until: EpochId,
    ) -> (RewardSplit, Wei) {
        let commission = self.params.validator_commission;
        let mut split = RewardSplit::default();
        let mut penalty = 0;
        for epoch in from..=until {
            let full = self.full_delegation_epoch_reward(
                delegation.to_staker_id,
                epoch,
                delegation.amount,
                commission,
            );
            let epoch_split = self.split_epoch_reward(full, epoch, delegation.lockup);
            if epoch_split.lockup_base > 0 || epoch_split.lockup_extra > 0 {
                penalty += apply_ratio(epoch_split.lockup_base, self.params.lockup_base_penalty_share)
                    + apply_ratio(
                        epoch_split.lockup_extra,
                        self.params.lockup_extra_penalty_share,
                    );
            }
            split.accumulate(epoch_split);
        }
        (split, penalty)
    }

    fn settle_validator_rewards(
        &mut self,
        caller: &Address,
        max_epochs: u64,
    ) -> Result<(StakerId, RewardSplit, EpochId), StakingError> {
        let staker_id = self.staker_id_by_owner(caller)?;
        let staker = self.active_staker_ref(staker_id)?;
        let (from, until) = match self.claim_range(staker.paid_until_epoch, 0, max_epochs) {
            Ok(range) => range,
            Err(StakingError::FutureEpoch(_)) => return Err(StakingError::NoEpochsClaimed),
            Err(err) => return Err(err),
        };
        let split = self.sum_validator_split(staker, from, until);
        self.stakers
            .get_mut(&staker_id)
            .expect("id is indexed")
            .paid_until_epoch = until;
        self.total_burnt_lockup_rewards += split.burnt;
        Ok((staker_id, split, until))
    }

    fn settle_delegation_rewards(
        &mut self,
        caller: &Address,
        max_epochs: u64,
        staker_id: StakerId,
    ) -> Result<(RewardSplit, EpochId), StakingError> {
        let delegation = self.active_delegation_ref(caller)?;
        if delegation.to_staker_id != staker_id {
            return Err(StakingError::DelegationNotFound);
        }
        let (from, until) = match self.claim_range(delegation.paid_until_epoch, 0, max_epochs) {
            Ok(range) => range,
            Err(StakingError::FutureEpoch(_)) => return Err(StakingError::NoEpochsClaimed),
            Err(err) => return Err(err),
        };
        let (split, penalty) = self.sum_delegation_split(delegation, from, until);
        self.delegations
            .get_mut(caller)
            .expect("checked above")
            .paid_until_epoch = until;
        self.total_burnt_lockup_rewards += split.burnt;
        if penalty > 0 {
            *self.early_withdrawal_penalties.entry(*caller).or_default() += penalty;
        }
        Ok((split, until))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{addr, ledger_with_defaults};
    use stakenet_types::WEI_PER_TOKEN;

    /// One validator with 1.0 self-stake and a 3.0 delegation, pool of
    /// 1_000_000 wei per epoch at the default 15% commission.
    fn setup() -> StakingLedger {
        let mut ledger = ledger_with_defaults();
        ledger
            .create_stake(addr(1), 100, WEI_PER_TOKEN, Vec::new())
            .unwrap();
        ledger
            .create_delegation(addr(2), 100, 1, 3 * WEI_PER_TOKEN)
            .unwrap();
        ledger.advance_epoch_with_reward(10_000, 10_000, 1_000_000);
        ledger
    }

    #[test]
    fn epoch_reward_splits_by_commission() {
        let ledger = setup();
        assert_eq!(ledger.calc_raw_validator_epoch_reward(1, 1), 1_000_000);
        // stake weight 1.0 + 15% of 3.0 = 1.45 of 4.0
        assert_eq!(ledger.calc_validator_epoch_reward(1, 1, 150_000), 362_500);
        // 85% of 3.0 = 2.55 of 4.0
        assert_eq!(
            ledger.calc_delegation_epoch_reward(&addr(2), 1, 1, 3 * WEI_PER_TOKEN, 150_000),
            637_500
        );
        // nothing for unsealed or unknown epochs
        assert_eq!(ledger.calc_raw_validator_epoch_reward(1, 2), 0);
        assert_eq!(ledger.calc_raw_validator_epoch_reward(9, 1), 0);
    }

    #[test]
    fn reward_pool_splits_between_validators_by_weight() {
        let mut ledger = ledger_with_defaults();
        ledger
            .create_stake(addr(1), 100, WEI_PER_TOKEN, Vec::new())
            .unwrap();
        ledger
            .create_delegation(addr(2), 100, 1, 3 * WEI_PER_TOKEN)
            .unwrap();
        ledger
            .create_stake(addr(3), 100, WEI_PER_TOKEN, Vec::new())
            .unwrap();
        ledger.advance_epoch_with_reward(10_000, 10_000, 1_000_000);

        // weights 4.0 and 1.0 of 5.0
        assert_eq!(ledger.calc_raw_validator_epoch_reward(1, 1), 800_000);
        assert_eq!(ledger.calc_raw_validator_epoch_reward(2, 1), 200_000);
        assert_eq!(ledger.calc_validator_epoch_reward(1, 1, 150_000), 290_000);
        assert_eq!(
            ledger.calc_delegation_epoch_reward(&addr(2), 1, 1, 3 * WEI_PER_TOKEN, 150_000),
            510_000
        );
        assert_eq!(ledger.calc_validator_epoch_reward(2, 1, 150_000), 200_000);
    }

    #[test]
    fn claims_advance_the_watermark() {
        let mut ledger = setup();
        ledger.advance_epoch_with_reward(20_000, 10_000, 1_000_000);

        let preview = ledger.calc_validator_rewards(1, 0, 100).unwrap();
        assert_eq!(preview.amount, 725_000);
        assert_eq!(preview.burnt, 0);
        assert_eq!(preview.from_epoch, 1);
        assert_eq!(preview.until_epoch, 2);

        let transfer = ledger.claim_validator_rewards(addr(1), 100).unwrap();
        assert_eq!(transfer.amount, 725_000);
        assert_eq!(ledger.staker(1).unwrap().paid_until_epoch, 2);
        assert_eq!(
            ledger.claim_validator_rewards(addr(1), 100),
            Err(StakingError::NoEpochsClaimed)
        );

        let transfer = ledger.claim_delegation_rewards(addr(2), 100, 1).unwrap();
        assert_eq!(transfer.amount, 1_275_000);
        assert_eq!(ledger.delegation(&addr(2)).unwrap().paid_until_epoch, 2);
    }

    #[test]
    fn max_epochs_bounds_a_claim() {
        let mut ledger = setup();
        ledger.advance_epoch_with_reward(20_000, 10_000, 1_000_000);
        ledger.advance_epoch_with_reward(30_000, 10_000, 1_000_000);

        let transfer = ledger.claim_validator_rewards(addr(1), 2).unwrap();
        assert_eq!(transfer.amount, 725_000);
        assert_eq!(ledger.staker(1).unwrap().paid_until_epoch, 2);
        let transfer = ledger.claim_validator_rewards(addr(1), 2).unwrap();
        assert_eq!(transfer.amount, 362_500);
        assert_eq!(ledger.staker(1).unwrap().paid_until_epoch, 3);
    }

    #[test]
    fn explicit_range_validation() {
        let ledger = setup();
        assert_eq!(
            ledger.calc_validator_rewards(1, 0, 0),
            Err(StakingError::InvalidEpochRange)
        );
        assert_eq!(
            ledger.calc_validator_rewards(1, 2, 10),
            Err(StakingError::FutureEpoch(2))
        );
        let preview = ledger.calc_validator_rewards(1, 1, 10).unwrap();
        assert_eq!(preview.amount, 362_500);
    }

    #[test]
    fn compound_claims_grow_the_principal() {
        let mut ledger = setup();
        ledger.claim_validator_compound_rewards(addr(1), 100).unwrap();
        assert_eq!(
            ledger.staker(1).unwrap().stake_amount,
            WEI_PER_TOKEN + 362_500
        );
        assert_eq!(ledger.stake_total_amount(), WEI_PER_TOKEN + 362_500);

        ledger
            .claim_delegation_compound_rewards(addr(2), 100, 1)
            .unwrap();
        assert_eq!(
            ledger.delegation(&addr(2)).unwrap().amount,
            3 * WEI_PER_TOKEN + 637_500
        );
        assert_eq!(
            ledger.delegations_total_amount(),
            3 * WEI_PER_TOKEN + 637_500
        );
        assert_eq!(
            ledger.staker(1).unwrap().delegated_me,
            3 * WEI_PER_TOKEN + 637_500
        );
    }

    #[test]
    fn discard_forfeits_without_paying() {
        let mut ledger = setup();
        ledger.discard_validator_rewards(addr(1)).unwrap();
        assert_eq!(ledger.staker(1).unwrap().paid_until_epoch, 1);
        assert_eq!(
            ledger.claim_validator_rewards(addr(1), 100),
            Err(StakingError::NoEpochsClaimed)
        );

        ledger.discard_delegation_rewards(addr(2), 1).unwrap();
        assert_eq!(ledger.delegation(&addr(2)).unwrap().paid_until_epoch, 1);
    }

    #[test]
    fn epochs_outside_the_snapshot_pay_nothing() {
        let mut ledger = setup();
        // joins during epoch 2, so epoch 2's snapshot includes it but
        // epoch 1's does not
        ledger
            .create_stake(addr(5), 15_000, WEI_PER_TOKEN, Vec::new())
            .unwrap();
        ledger.advance_epoch_with_reward(20_000, 10_000, 1_000_000);

        assert_eq!(ledger.calc_raw_validator_epoch_reward(2, 1), 0);
        // epoch 2 weight: 1.0 of 5.0
        assert_eq!(ledger.calc_raw_validator_epoch_reward(2, 2), 200_000);
    }
}
