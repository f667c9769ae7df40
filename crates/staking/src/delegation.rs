//! Delegation lifecycle: binding a depositor's funds to one staker.

use crate::errors::StakingError;
use crate::ledger::StakingLedger;
use crate::math::apply_ratio;
use crate::records::{Delegation, Transfer, WithdrawalKind, WithdrawalRequest};
use stakenet_types::{Address, StakerId, Timestamp, Wei};
use tracing::{debug, info};

impl StakingLedger {
    /// Delegate `amount` wei to an active staker.
    ///
    /// A depositor holds at most one delegation at a time, and the staker's
    /// delegations may never exceed `max_delegated_ratio` times its
    /// self-stake.
    pub fn create_delegation(
        &mut self,
        caller: Address,
        now: Timestamp,
        staker_id: StakerId,
        amount: Wei,
    ) -> Result<(), StakingError> {
        let staker = self.active_staker_ref(staker_id)?;
        if staker.is_cheater {
            return Err(StakingError::StakerIsCheater);
        }
        if amount < self.params.min_delegation {
            return Err(StakingError::InsufficientDelegation);
        }
        if self.delegations.contains_key(&caller) {
            return Err(StakingError::DelegationAlreadyExists);
        }
        if staker.delegated_me + amount > apply_ratio(staker.stake_amount, self.params.max_delegated_ratio)
        {
            return Err(StakingError::DelegatedLimitExceeded);
        }

        let delegation = Delegation {
            depositor: caller,
            to_staker_id: staker_id,
            amount,
            created_epoch: self.current_epoch(),
            created_time: now,
            deactivated_epoch: 0,
            deactivated_time: 0,
            paid_until_epoch: self.current_sealed_epoch,
            lockup: None,
        };
        self.delegations.insert(caller, delegation);
        self.delegations_num += 1;
        self.delegations_total_amount += amount;
        let staker = self.stakers.get_mut(&staker_id).expect("checked above");
        staker.delegated_me += amount;
        let staker_owner = staker.owner;
        self.emit_refreshed(caller);
        self.emit_refreshed(staker_owner);

        info!(
            target: "staking",
            "{} delegated {} wei to staker {}", caller, amount, staker_id
        );
        Ok(())
    }

    /// Top up the caller's active delegation.
    pub fn increase_delegation(
        &mut self,
        caller: Address,
        amount: Wei,
    ) -> Result<(), StakingError> {
        let delegation = self.active_delegation_ref(&caller)?;
        let staker_id = delegation.to_staker_id;
        if amount < self.params.min_delegation_increase {
            return Err(StakingError::TooSmallAmount);
        }
        let staker = self.active_staker_ref(staker_id)?;
        if staker.is_cheater {
            return Err(StakingError::StakerIsCheater);
        }
        if staker.delegated_me + amount > apply_ratio(staker.stake_amount, self.params.max_delegated_ratio)
        {
            return Err(StakingError::DelegatedLimitExceeded);
        }

        self.delegations.get_mut(&caller).expect("checked above").amount += amount;
        self.delegations_total_amount += amount;
        let staker = self.stakers.get_mut(&staker_id).expect("checked above");
        staker.delegated_me += amount;
        let staker_owner = staker.owner;
        self.emit_refreshed(caller);
        self.emit_refreshed(staker_owner);

        debug!(target: "staking", "{} increased delegation by {} wei", caller, amount);
        Ok(())
    }

    /// Deactivate the caller's delegation, starting the withdrawal delay.
    ///
    /// An exit before the voluntary lock expires forfeits the accrued
    /// early-withdrawal penalty from the credited amount.
    pub fn prepare_to_withdraw_delegation(
        &mut self,
        caller: Address,
        now: Timestamp,
        staker_id: StakerId,
    ) -> Result<(), StakingError> {
        let delegation = self.active_delegation_ref(&caller)?;
        if delegation.to_staker_id != staker_id {
            return Err(StakingError::DelegationNotFound);
        }
        if delegation.paid_until_epoch != self.current_sealed_epoch {
            return Err(StakingError::NotAllRewardsClaimed);
        }
        let amount = delegation.amount;
        let penalty = self.pending_delegation_penalty(&caller, now, amount);

        let deactivated_epoch = self.current_epoch();
        let delegation = self.delegations.get_mut(&caller).expect("checked above");
        delegation.deactivated_epoch = deactivated_epoch;
        delegation.deactivated_time = now;
        delegation.amount = amount - penalty;
        self.delegations_total_amount -= amount;
        self.forfeited_penalties_total += penalty;
        self.early_withdrawal_penalties.remove(&caller);
        if let Some(staker) = self.stakers.get_mut(&staker_id) {
            staker.delegated_me -= amount;
            let staker_owner = staker.owner;
            self.emit_refreshed(staker_owner);
        }
        self.emit_recalculated(caller);

        info!(
            target: "staking",
            "{} deactivated delegation to staker {} (penalty {} wei)", caller, staker_id, penalty
        );
        Ok(())
    }

    /// Queue a partial withdrawal of the caller's delegation under the fresh
    /// request id `wr_id`. The penalty for an early exit is applied to the
    /// recorded amount now, not at execution time.
    pub fn prepare_to_withdraw_delegation_partial(
        &mut self,
        caller: Address,
        now: Timestamp,
        wr_id: u64,
        staker_id: StakerId,
        amount: Wei,
    ) -> Result<(), StakingError> {
        let delegation = self.active_delegation_ref(&caller)?;
        if delegation.to_staker_id != staker_id {
            return Err(StakingError::DelegationNotFound);
        }
        if delegation.paid_until_epoch != self.current_sealed_epoch {
            return Err(StakingError::NotAllRewardsClaimed);
        }
        if self.withdrawal_request(&caller, wr_id).is_some() {
            return Err(StakingError::RequestAlreadyExists);
        }
        if amount < self.params.min_delegation_increase {
            return Err(StakingError::TooSmallAmount);
        }
        let remaining = delegation
            .amount
            .checked_sub(amount)
            .filter(|rest| *rest >= self.params.min_delegation)
            .ok_or(StakingError::InsufficientDelegation)?;
        let penalty = self.pending_delegation_penalty(&caller, now, amount);

        let epoch = self.current_epoch();
        let delegation = self.delegations.get_mut(&caller).expect("checked above");
        delegation.amount = remaining;
        self.delegations_total_amount -= amount;
        self.forfeited_penalties_total += penalty;
        if penalty > 0 {
            let accrued = self.early_withdrawal_penalties.entry(caller).or_default();
            *accrued = accrued.saturating_sub(penalty);
        }
        if let Some(staker) = self.stakers.get_mut(&staker_id) {
            staker.delegated_me -= amount;
            let staker_owner = staker.owner;
            self.emit_refreshed(staker_owner);
        }
        self.withdrawal_requests.entry(caller).or_default().insert(
            wr_id,
            WithdrawalRequest {
                kind: WithdrawalKind::Delegation { staker_id },
                amount: amount - penalty,
                epoch,
                time: now,
            },
        );
        self.emit_refreshed(caller);

        debug!(
            target: "staking",
            "{} queued partial delegation withdrawal {} of {} wei (penalty {})",
            caller, wr_id, amount, penalty
        );
        Ok(())
    }

    /// Release a deactivated delegation after both withdrawal delays.
    ///
    /// Funds delegated to a cheater divert to the slashed accumulator.
    pub fn withdraw_delegation(
        &mut self,
        caller: Address,
        now: Timestamp,
        staker_id: StakerId,
    ) -> Result<Option<Transfer>, StakingError> {
        let delegation = self.delegation_ref(&caller)?;
        if delegation.to_staker_id != staker_id {
            return Err(StakingError::DelegationNotFound);
        }
        if delegation.deactivated_epoch == 0 {
            return Err(StakingError::DelegationNotDeactivated);
        }
        self.check_unlock_delays(
            now,
            delegation.deactivated_time,
            delegation.deactivated_epoch,
            self.params.delegation_lock_period_time,
            self.params.delegation_lock_period_epochs,
        )?;

        let delegation = self.delegations.remove(&caller).expect("checked above");
        self.delegations_num -= 1;
        self.emit_recalculated(caller);

        if self.cheaters.contains(&staker_id) {
            self.slashed_delegations_total_amount += delegation.amount;
            info!(
                target: "staking",
                "{} withdrew delegation to cheater {}: {} wei slashed",
                caller, staker_id, delegation.amount
            );
            Ok(None)
        } else {
            info!(
                target: "staking",
                "{} withdrew delegation to staker {}: {} wei returned",
                caller, staker_id, delegation.amount
            );
            Ok(Some(Transfer {
                to: caller,
                amount: delegation.amount,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{addr, ledger_with_defaults};
    use stakenet_types::WEI_PER_TOKEN;

    const DAY: u64 = 86_400;

    fn setup() -> StakingLedger {
        let mut ledger = ledger_with_defaults();
        ledger
            .create_stake(addr(1), 100, 2 * WEI_PER_TOKEN, Vec::new())
            .unwrap();
        ledger
    }

    #[test]
    fn create_delegation_enforces_ceiling_and_uniqueness() {
        let mut ledger = setup();
        ledger
            .create_delegation(addr(10), 100, 1, WEI_PER_TOKEN)
            .unwrap();
        assert_eq!(
            ledger.create_delegation(addr(11), 100, 9, WEI_PER_TOKEN),
            Err(StakingError::StakerNotFound)
        );
        assert_eq!(
            ledger.create_delegation(addr(11), 100, 1, WEI_PER_TOKEN - 1),
            Err(StakingError::InsufficientDelegation)
        );
        // ceiling: 15x of 2.0 = 30.0, 1.0 already taken
        assert_eq!(
            ledger.create_delegation(addr(11), 100, 1, 29 * WEI_PER_TOKEN + 1),
            Err(StakingError::DelegatedLimitExceeded)
        );
        ledger
            .create_delegation(addr(11), 100, 1, 29 * WEI_PER_TOKEN)
            .unwrap();
        assert_eq!(
            ledger.create_delegation(addr(10), 100, 1, WEI_PER_TOKEN),
            Err(StakingError::DelegationAlreadyExists)
        );

        assert_eq!(ledger.delegations_num(), 2);
        assert_eq!(ledger.delegations_total_amount(), 30 * WEI_PER_TOKEN);
        assert_eq!(ledger.staker(1).unwrap().delegated_me, 30 * WEI_PER_TOKEN);

        let delegation = ledger.delegation(&addr(10)).unwrap();
        assert_eq!(delegation.to_staker_id, 1);
        assert_eq!(delegation.created_epoch, 1);
        assert_eq!(delegation.created_time, 100);
    }

    #[test]
    fn increase_delegation_needs_an_existing_active_one() {
        let mut ledger = setup();
        assert_eq!(
            ledger.increase_delegation(addr(10), WEI_PER_TOKEN),
            Err(StakingError::DelegationNotFound)
        );
        ledger
            .create_delegation(addr(10), 100, 1, WEI_PER_TOKEN)
            .unwrap();
        assert_eq!(
            ledger.increase_delegation(addr(10), WEI_PER_TOKEN / 100),
            Err(StakingError::TooSmallAmount)
        );
        ledger.increase_delegation(addr(10), WEI_PER_TOKEN).unwrap();
        assert_eq!(
            ledger.delegation(&addr(10)).unwrap().amount,
            2 * WEI_PER_TOKEN
        );
        assert_eq!(ledger.staker(1).unwrap().delegated_me, 2 * WEI_PER_TOKEN);
    }

    #[test]
    fn full_withdrawal_round_trip() {
        let mut ledger = setup();
        ledger
            .create_delegation(addr(10), 100, 1, 5 * WEI_PER_TOKEN)
            .unwrap();
        ledger.prepare_to_withdraw_delegation(addr(10), 200, 1).unwrap();

        assert_eq!(ledger.delegations_total_amount(), 0);
        assert_eq!(ledger.staker(1).unwrap().delegated_me, 0);
        assert_eq!(
            ledger.prepare_to_withdraw_delegation(addr(10), 200, 1),
            Err(StakingError::DelegationDeactivated)
        );

        for _ in 0..4 {
            ledger.advance_epoch(1_000, 1_000);
        }
        let transfer = ledger
            .withdraw_delegation(addr(10), 200 + 7 * DAY, 1)
            .unwrap();
        assert_eq!(
            transfer,
            Some(Transfer {
                to: addr(10),
                amount: 5 * WEI_PER_TOKEN
            })
        );
        assert_eq!(ledger.delegations_num(), 0);
        assert!(ledger.delegation(&addr(10)).is_none());
    }

    #[test]
    fn partial_withdrawal_keeps_minimum_delegation() {
        let mut ledger = setup();
        ledger
            .create_delegation(addr(10), 100, 1, 2 * WEI_PER_TOKEN)
            .unwrap();
        assert_eq!(
            ledger.prepare_to_withdraw_delegation_partial(
                addr(10),
                200,
                1,
                1,
                2 * WEI_PER_TOKEN
            ),
            Err(StakingError::InsufficientDelegation)
        );
        ledger
            .prepare_to_withdraw_delegation_partial(addr(10), 200, 1, 1, WEI_PER_TOKEN)
            .unwrap();
        assert_eq!(ledger.delegation(&addr(10)).unwrap().amount, WEI_PER_TOKEN);
        assert_eq!(ledger.staker(1).unwrap().delegated_me, WEI_PER_TOKEN);
        let request = ledger.withdrawal_request(&addr(10), 1).unwrap();
        assert_eq!(request.amount, WEI_PER_TOKEN);
        assert_eq!(request.kind, WithdrawalKind::Delegation { staker_id: 1 });
    }

    #[test]
    fn cannot_delegate_to_cheater() {
        let mut ledger = setup();
        ledger
            .mark_cheater(crate::testutil::owner(), 1, true)
            .unwrap();
        assert_eq!(
            ledger.create_delegation(addr(10), 100, 1, WEI_PER_TOKEN),
            Err(StakingError::StakerIsCheater)
        );
    }
}
