//! Voluntary lock-up of stake and delegations.
//!
//! Once the owner activates the feature from a chosen epoch, full rewards
//! are reserved for locked funds: an unlocked account keeps only
//! `unlocked_reward_ratio` of each epoch's reward and the remainder is
//! burnt. A locked account keeps everything, decomposed into a base part
//! (what an unlocked account would get) and an extra part, which feed the
//! early-withdrawal penalty if the lock is broken.

use crate::errors::StakingError;
use crate::ledger::StakingLedger;
use crate::math::apply_ratio;
use crate::records::{Lockup, RewardSplit};
use stakenet_types::{Address, EpochId, StakerId, Timestamp, Wei};
use tracing::info;

impl StakingLedger {
    /// Activate the lock-up feature starting at `epoch` (owner only).
    ///
    /// Re-settable until the chosen epoch is reached; afterwards the start
    /// is frozen.
    pub fn start_locked_up(&mut self, caller: Address, epoch: EpochId) -> Result<(), StakingError> {
        self.require_owner(&caller)?;
        if epoch < self.current_sealed_epoch + 1 {
            return Err(StakingError::CannotStartInPast);
        }
        if self.first_locked_up_epoch != 0
            && self.first_locked_up_epoch <= self.current_sealed_epoch + 1
        {
            return Err(StakingError::FeatureAlreadyStarted);
        }
        self.first_locked_up_epoch = epoch;
        info!(target: "staking", "lock-up feature starts at epoch {}", epoch);
        Ok(())
    }

    /// Lock the caller's self-stake for `duration` seconds, starting now.
    ///
    /// An existing lock may only be extended, and an expired lock may only
    /// be replaced once its rewards are fully claimed.
    pub fn lock_up_stake(
        &mut self,
        caller: Address,
        now: Timestamp,
        duration: u64,
    ) -> Result<(), StakingError> {
        self.check_lockup_feature_active()?;
        self.check_lockup_duration(duration)?;
        let staker_id = self.staker_id_by_owner(&caller)?;
        let staker = self.active_staker_ref(staker_id)?;
        if staker.is_cheater {
            return Err(StakingError::StakerIsCheater);
        }
        let end_time = now + duration;
        self.check_relock(staker.lockup, staker.paid_until_epoch, now, end_time)?;

        let from_epoch = self.current_epoch();
        self.stakers.get_mut(&staker_id).expect("id is indexed").lockup = Some(Lockup {
            from_epoch,
            end_time,
            duration,
        });
        info!(
            target: "staking",
            "staker {} locked stake until {} (from epoch {})", staker_id, end_time, from_epoch
        );
        Ok(())
    }

    /// Lock the caller's delegation for `duration` seconds, starting now.
    ///
    /// The delegation's lock must end no later than the staker's own, so a
    /// validator exit can never strand locked delegations.
    pub fn lock_up_delegation(
        &mut self,
        caller: Address,
        now: Timestamp,
        duration: u64,
        staker_id: StakerId,
    ) -> Result<(), StakingError> {
        self.check_lockup_feature_active()?;
        self.check_lockup_duration(duration)?;
        let delegation = self.active_delegation_ref(&caller)?;
        if delegation.to_staker_id != staker_id {
            return Err(StakingError::DelegationNotFound);
        }
        let staker = self.active_staker_ref(staker_id)?;
        if staker.is_cheater {
            return Err(StakingError::StakerIsCheater);
        }
        let end_time = now + duration;
        let staker_locked_through = staker
            .lockup
            .filter(|lock| lock.is_active(now))
            .map(|lock| lock.end_time)
            .unwrap_or(0);
        if staker_locked_through < end_time {
            return Err(StakingError::StakerLockEndsFirst);
        }
        self.check_relock(delegation.lockup, delegation.paid_until_epoch, now, end_time)?;

        let from_epoch = self.current_epoch();
        self.delegations.get_mut(&caller).expect("checked above").lockup = Some(Lockup {
            from_epoch,
            end_time,
            duration,
        });
        info!(
            target: "staking",
            "{} locked delegation to staker {} until {} (from epoch {})",
            caller, staker_id, end_time, from_epoch
        );
        Ok(())
    }

    /// Preview the four-way split of a validator claim over up to
    /// `max_epochs` epochs starting at `from_epoch` (0 = watermark).
    pub fn calc_validator_lockup_rewards(
        &self,
        staker_id: StakerId,
        from_epoch: EpochId,
        max_epochs: u64,
    ) -> Result<RewardSplit, StakingError> {
        let staker = self.staker_ref(staker_id)?;
        let (from, until) = self.claim_range(staker.paid_until_epoch, from_epoch, max_epochs)?;
        Ok(self.sum_validator_split(staker, from, until))
    }

    /// Preview the four-way split of a delegation claim.
    pub fn calc_delegation_lockup_rewards(
        &self,
        depositor: &Address,
        from_epoch: EpochId,
        max_epochs: u64,
    ) -> Result<RewardSplit, StakingError> {
        let delegation = self.delegation_ref(depositor)?;
        let (from, until) = self.claim_range(delegation.paid_until_epoch, from_epoch, max_epochs)?;
        let (split, _) = self.sum_delegation_split(delegation, from, until);
        Ok(split)
    }

    // --- internals ---

    /// Whether rewards of sealed epoch `epoch` fall under the lock-up rules.
    pub(crate) fn lockup_feature_active_for(&self, epoch: EpochId) -> bool {
        self.first_locked_up_epoch != 0 && self.first_locked_up_epoch <= epoch
    }

    fn check_lockup_feature_active(&self) -> Result<(), StakingError> {
        if !self.lockup_feature_active_for(self.current_epoch()) {
            return Err(StakingError::FeatureNotActivated);
        }
        Ok(())
    }

    fn check_lockup_duration(&self, duration: u64) -> Result<(), StakingError> {
        if duration < self.params.min_lockup_duration || duration > self.params.max_lockup_duration
        {
            return Err(StakingError::IncorrectDuration);
        }
        Ok(())
    }

    /// A running lock may only be extended; an expired one may only be
    /// replaced once every epoch it covered has been claimed.
    fn check_relock(
        &self,
        existing: Option<Lockup>,
        paid_until: EpochId,
        now: Timestamp,
        new_end: Timestamp,
    ) -> Result<(), StakingError> {
        match existing {
            Some(lock) if lock.is_active(now) => {
                if new_end <= lock.end_time {
                    return Err(StakingError::AlreadyLockedUp);
                }
            }
            Some(_) => {
                if paid_until != self.current_sealed_epoch {
                    return Err(StakingError::NotAllLockupRewardsClaimed);
                }
            }
            None => {}
        }
        Ok(())
    }

    /// Split one epoch's full reward for an account with the given lock.
    ///
    /// Before the feature's first epoch everything is unlocked and nothing
    /// burns. Afterwards a lock covering the whole epoch keeps the full
    /// amount (base + extra); otherwise only the base fraction survives and
    /// the rest is burnt.
    pub(crate) fn split_epoch_reward(
        &self,
        full: Wei,
        epoch: EpochId,
        lockup: Option<Lockup>,
    ) -> RewardSplit {
        let mut split = RewardSplit::default();
        if full == 0 {
            return split;
        }
        if !self.lockup_feature_active_for(epoch) {
            split.unlocked = full;
            return split;
        }
        let covered = match (lockup, self.snapshots.get(&epoch)) {
            (Some(lock), Some(snapshot)) => {
                lock.from_epoch <= epoch && snapshot.end_time <= lock.end_time
            }
            _ => false,
        };
        let base = apply_ratio(full, self.params.unlocked_reward_ratio);
        if covered {
            split.lockup_base = base;
            split.lockup_extra = full - base;
        } else {
            split.unlocked = base;
            split.burnt = full - base;
        }
        split
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{addr, ledger_with_defaults, owner};
    use stakenet_types::WEI_PER_TOKEN;

    const DAY: u64 = 86_400;

    /// Validator 1 with 1.0 self-stake and a 3.0 delegation from addr(2),
    /// feature active from epoch 1, pool 1_000_000 per epoch.
    fn setup() -> StakingLedger {
        let mut ledger = ledger_with_defaults();
        ledger
            .create_stake(addr(1), 100, WEI_PER_TOKEN, Vec::new())
            .unwrap();
        ledger
            .create_delegation(addr(2), 100, 1, 3 * WEI_PER_TOKEN)
            .unwrap();
        ledger.start_locked_up(owner(), 1).unwrap();
        ledger
    }

    #[test]
    fn feature_start_is_resettable_until_reached() {
        let mut ledger = ledger_with_defaults();
        assert_eq!(
            ledger.start_locked_up(addr(9), 5),
            Err(StakingError::NotOwner)
        );
        assert_eq!(
            ledger.start_locked_up(owner(), 0),
            Err(StakingError::CannotStartInPast)
        );
        ledger.start_locked_up(owner(), 5).unwrap();
        // not reached yet, still movable
        ledger.start_locked_up(owner(), 3).unwrap();
        ledger.start_locked_up(owner(), 1).unwrap();
        assert_eq!(
            ledger.start_locked_up(owner(), 4),
            Err(StakingError::FeatureAlreadyStarted)
        );
        assert_eq!(ledger.first_locked_up_epoch(), 1);
    }

    #[test]
    fn lock_requires_feature_and_sane_duration() {
        let mut ledger = ledger_with_defaults();
        ledger
            .create_stake(addr(1), 100, WEI_PER_TOKEN, Vec::new())
            .unwrap();
        assert_eq!(
            ledger.lock_up_stake(addr(1), 100, 14 * DAY),
            Err(StakingError::FeatureNotActivated)
        );
        ledger.start_locked_up(owner(), 1).unwrap();
        assert_eq!(
            ledger.lock_up_stake(addr(1), 100, 14 * DAY - 1),
            Err(StakingError::IncorrectDuration)
        );
        assert_eq!(
            ledger.lock_up_stake(addr(1), 100, 366 * DAY),
            Err(StakingError::IncorrectDuration)
        );
        ledger.lock_up_stake(addr(1), 100, 14 * DAY).unwrap();

        let lock = ledger.staker(1).unwrap().lockup.unwrap();
        assert_eq!(lock.from_epoch, 1);
        assert_eq!(lock.end_time, 100 + 14 * DAY);
        assert_eq!(lock.duration, 14 * DAY);
    }

    #[test]
    fn running_lock_can_only_be_extended() {
        let mut ledger = setup();
        ledger.lock_up_stake(addr(1), 100, 30 * DAY).unwrap();
        assert_eq!(
            ledger.lock_up_stake(addr(1), 200, 14 * DAY),
            Err(StakingError::AlreadyLockedUp)
        );
        ledger.lock_up_stake(addr(1), 200, 60 * DAY).unwrap();
        assert_eq!(
            ledger.staker(1).unwrap().lockup.unwrap().end_time,
            200 + 60 * DAY
        );
    }

    #[test]
    fn relock_after_expiry_needs_claimed_rewards() {
        let mut ledger = setup();
        ledger.lock_up_stake(addr(1), 100, 14 * DAY).unwrap();
        ledger.advance_epoch_with_reward(10_000, 10_000, 1_000_000);

        let now = 100 + 14 * DAY + 1;
        assert_eq!(
            ledger.lock_up_stake(addr(1), now, 14 * DAY),
            Err(StakingError::NotAllLockupRewardsClaimed)
        );
        ledger.claim_validator_rewards(addr(1), 100).unwrap();
        ledger.lock_up_stake(addr(1), now, 14 * DAY).unwrap();
    }

    #[test]
    fn delegation_lock_cannot_outlive_the_stakers() {
        let mut ledger = setup();
        assert_eq!(
            ledger.lock_up_delegation(addr(2), 100, 14 * DAY, 1),
            Err(StakingError::StakerLockEndsFirst)
        );
        ledger.lock_up_stake(addr(1), 100, 14 * DAY).unwrap();
        assert_eq!(
            ledger.lock_up_delegation(addr(2), 200, 14 * DAY, 1),
            Err(StakingError::StakerLockEndsFirst)
        );
        ledger.lock_up_delegation(addr(2), 100, 14 * DAY, 1).unwrap();
        assert_eq!(
            ledger.delegation(&addr(2)).unwrap().lockup.unwrap().end_time,
            100 + 14 * DAY
        );
    }

    #[test]
    fn split_keeps_everything_for_covered_epochs() {
        let mut ledger = setup();
        ledger.lock_up_stake(addr(1), 100, 14 * DAY).unwrap();
        ledger.advance_epoch_with_reward(10_000, 10_000, 1_000_000);

        // full validator reward 362_500; lock covers the epoch
        let split = ledger.calc_validator_lockup_rewards(1, 0, 100).unwrap();
        assert_eq!(
            split,
            RewardSplit {
                unlocked: 0,
                lockup_base: 108_750,
                lockup_extra: 253_750,
                burnt: 0,
            }
        );
        assert_eq!(split.payable(), 362_500);
    }

    #[test]
    fn split_burns_for_unlocked_accounts_once_active() {
        let mut ledger = setup();
        ledger.advance_epoch_with_reward(10_000, 10_000, 1_000_000);

        let split = ledger.calc_validator_lockup_rewards(1, 0, 100).unwrap();
        assert_eq!(
            split,
            RewardSplit {
                unlocked: 108_750,
                lockup_base: 0,
                lockup_extra: 0,
                burnt: 253_750,
            }
        );

        let split = ledger.calc_delegation_lockup_rewards(&addr(2), 0, 100).unwrap();
        assert_eq!(split.unlocked, 191_250);
        assert_eq!(split.burnt, 446_250);

        let transfer = ledger.claim_validator_rewards(addr(1), 100).unwrap();
        assert_eq!(transfer.amount, 108_750);
        assert_eq!(ledger.total_burnt_lockup_rewards(), 253_750);
    }

    #[test]
    fn split_pays_in_full_before_the_feature_epoch() {
        let mut ledger = ledger_with_defaults();
        ledger
            .create_stake(addr(1), 100, WEI_PER_TOKEN, Vec::new())
            .unwrap();
        ledger.advance_epoch_with_reward(10_000, 10_000, 1_000_000);
        ledger.start_locked_up(owner(), 2).unwrap();
        ledger.advance_epoch_with_reward(20_000, 10_000, 1_000_000);

        // epoch 1 predates the feature, epoch 2 is under it
        let split = ledger.calc_validator_lockup_rewards(1, 1, 1).unwrap();
        assert_eq!(split.unlocked, 1_000_000);
        assert_eq!(split.burnt, 0);
        let split = ledger.calc_validator_lockup_rewards(1, 2, 1).unwrap();
        assert_eq!(split.unlocked, 300_000);
        assert_eq!(split.burnt, 700_000);
    }

    #[test]
    fn lock_expiring_mid_range_stops_covering_later_epochs() {
        let mut ledger = setup();
        ledger.lock_up_stake(addr(1), 100, 14 * DAY).unwrap();
        ledger.advance_epoch_with_reward(10_000, 10_000, 1_000_000);
        // sealed after the lock's end, so not covered
        ledger.advance_epoch_with_reward(100 + 15 * DAY, 10_000, 1_000_000);

        let split = ledger.calc_validator_lockup_rewards(1, 0, 100).unwrap();
        assert_eq!(
            split,
            RewardSplit {
                unlocked: 108_750,
                lockup_base: 108_750,
                lockup_extra: 253_750,
                burnt: 253_750,
            }
        );
    }
}
