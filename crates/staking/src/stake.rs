//! Validator self-stake lifecycle: creation, top-up, deactivation and
//! withdrawal.

use crate::errors::StakingError;
use crate::ledger::StakingLedger;
use crate::math::apply_ratio;
use crate::records::{Staker, Transfer, WithdrawalKind, WithdrawalRequest};
use stakenet_types::{Address, StakerId, Timestamp, Wei};
use tracing::{debug, info};

impl StakingLedger {
    /// Create a validator stake owned by `caller`, funded with `amount` wei.
    ///
    /// Ids are dense, sequential and never reused; the stake participates in
    /// rewards from the epoch currently in progress onward.
    pub fn create_stake(
        &mut self,
        caller: Address,
        now: Timestamp,
        amount: Wei,
        metadata: Vec<u8>,
    ) -> Result<StakerId, StakingError> {
        if amount < self.params.min_stake {
            return Err(StakingError::InsufficientStake);
        }
        if self.staker_ids.contains_key(&caller) {
            return Err(StakingError::StakerAlreadyExists);
        }

        let id = self.stakers_last_id + 1;
        let staker = Staker {
            id,
            owner: caller,
            metadata,
            stake_amount: amount,
            delegated_me: 0,
            created_epoch: self.current_epoch(),
            created_time: now,
            deactivated_epoch: 0,
            deactivated_time: 0,
            is_cheater: false,
            paid_until_epoch: self.current_sealed_epoch,
            lockup: None,
        };
        self.stakers.insert(id, staker);
        self.staker_ids.insert(caller, id);
        self.stakers_last_id = id;
        self.stakers_num += 1;
        self.stake_total_amount += amount;
        self.emit_refreshed(caller);

        info!(target: "staking", "created staker {} ({}) with {} wei", id, caller, amount);
        Ok(id)
    }

    /// Top up an existing active stake. Owner-only.
    pub fn increase_stake(
        &mut self,
        caller: Address,
        staker_id: StakerId,
        amount: Wei,
    ) -> Result<(), StakingError> {
        let staker = self.active_staker_ref(staker_id)?;
        if staker.owner != caller {
            return Err(StakingError::NotOwner);
        }
        if amount < self.params.min_stake_decrease {
            return Err(StakingError::TooSmallAmount);
        }

        let staker = self.stakers.get_mut(&staker_id).expect("checked above");
        staker.stake_amount += amount;
        self.stake_total_amount += amount;
        self.emit_refreshed(caller);

        debug!(target: "staking", "staker {} increased stake by {} wei", staker_id, amount);
        Ok(())
    }

    /// Deactivate the caller's stake, starting the two-part withdrawal delay.
    ///
    /// Requires every sealed epoch claimed (or discarded) and any voluntary
    /// lock expired. The stake leaves the active totals immediately; the
    /// balance stays escrowed until [`withdraw_stake`](Self::withdraw_stake).
    pub fn prepare_to_withdraw_stake(
        &mut self,
        caller: Address,
        now: Timestamp,
    ) -> Result<(), StakingError> {
        let staker_id = self.staker_id_by_owner(&caller)?;
        let staker = self.active_staker_ref(staker_id)?;
        if staker.paid_until_epoch != self.current_sealed_epoch {
            return Err(StakingError::NotAllRewardsClaimed);
        }
        if staker.lockup.map_or(false, |lock| lock.is_active(now)) {
            return Err(StakingError::StakeIsLocked);
        }

        let deactivated_epoch = self.current_epoch();
        let staker = self.stakers.get_mut(&staker_id).expect("checked above");
        staker.deactivated_epoch = deactivated_epoch;
        staker.deactivated_time = now;
        let amount = staker.stake_amount;
        self.stake_total_amount -= amount;
        self.emit_recalculated(caller);

        info!(
            target: "staking",
            "staker {} deactivated at epoch {} ({} wei escrowed)",
            staker_id, deactivated_epoch, amount
        );
        Ok(())
    }

    /// Queue a partial withdrawal of the caller's stake under the fresh
    /// request id `wr_id`, without deactivating the validator.
    ///
    /// The remainder must keep the minimum stake and still cover the
    /// delegation ceiling.
    pub fn prepare_to_withdraw_stake_partial(
        &mut self,
        caller: Address,
        now: Timestamp,
        wr_id: u64,
        amount: Wei,
    ) -> Result<(), StakingError> {
        let staker_id = self.staker_id_by_owner(&caller)?;
        let staker = self.active_staker_ref(staker_id)?;
        if staker.paid_until_epoch != self.current_sealed_epoch {
            return Err(StakingError::NotAllRewardsClaimed);
        }
        if staker.lockup.map_or(false, |lock| lock.is_active(now)) {
            return Err(StakingError::StakeIsLocked);
        }
        if self.withdrawal_request(&caller, wr_id).is_some() {
            return Err(StakingError::RequestAlreadyExists);
        }
        if amount < self.params.min_stake_decrease {
            return Err(StakingError::TooSmallAmount);
        }
        let remaining = staker
            .stake_amount
            .checked_sub(amount)
            .filter(|rest| *rest >= self.params.min_stake)
            .ok_or(StakingError::InsufficientStake)?;
        if staker.delegated_me > apply_ratio(remaining, self.params.max_delegated_ratio) {
            return Err(StakingError::DelegatedLimitExceeded);
        }

        let epoch = self.current_epoch();
        let staker = self.stakers.get_mut(&staker_id).expect("checked above");
        staker.stake_amount = remaining;
        self.stake_total_amount -= amount;
        self.withdrawal_requests.entry(caller).or_default().insert(
            wr_id,
            WithdrawalRequest {
                kind: WithdrawalKind::Stake { staker_id },
                amount,
                epoch,
                time: now,
            },
        );
        self.emit_refreshed(caller);

        debug!(
            target: "staking",
            "staker {} queued partial withdrawal {} of {} wei", staker_id, wr_id, amount
        );
        Ok(())
    }

    /// Release a deactivated stake after both the wall-clock and the sealed
    /// epoch delays have elapsed.
    ///
    /// Cheater funds divert to the slashed accumulator with no transfer; the
    /// staker record is removed either way and its id is never reused.
    pub fn withdraw_stake(
        &mut self,
        caller: Address,
        now: Timestamp,
    ) -> Result<Option<Transfer>, StakingError> {
        let staker_id = self.staker_id_by_owner(&caller)?;
        let staker = self.staker_ref(staker_id)?;
        if staker.deactivated_epoch == 0 {
            return Err(StakingError::StakerNotDeactivated);
        }
        self.check_unlock_delays(
            now,
            staker.deactivated_time,
            staker.deactivated_epoch,
            self.params.stake_lock_period_time,
            self.params.stake_lock_period_epochs,
        )?;

        let staker = self.stakers.remove(&staker_id).expect("checked above");
        self.staker_ids.remove(&caller);
        self.stakers_num -= 1;
        self.emit_recalculated(caller);

        if self.cheaters.contains(&staker_id) {
            self.slashed_stake_total_amount += staker.stake_amount;
            info!(
                target: "staking",
                "staker {} withdrawn as cheater: {} wei slashed", staker_id, staker.stake_amount
            );
            Ok(None)
        } else {
            info!(
                target: "staking",
                "staker {} withdrawn: {} wei returned to {}", staker_id, staker.stake_amount, caller
            );
            Ok(Some(Transfer {
                to: caller,
                amount: staker.stake_amount,
            }))
        }
    }

    /// Two-part unlock shared by stake and delegation withdrawal paths.
    pub(crate) fn check_unlock_delays(
        &self,
        now: Timestamp,
        since_time: Timestamp,
        since_epoch: u64,
        period_time: u64,
        period_epochs: u64,
    ) -> Result<(), StakingError> {
        if now < since_time + period_time {
            return Err(StakingError::NotEnoughTimePassed);
        }
        if self.current_sealed_epoch < since_epoch + period_epochs {
            return Err(StakingError::NotEnoughEpochsPassed);
        }
        Ok(())
    }
}
