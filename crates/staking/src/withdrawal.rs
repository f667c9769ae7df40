//! Execution of queued partial-withdrawal requests.

use crate::errors::StakingError;
use crate::ledger::StakingLedger;
use crate::records::{Transfer, WithdrawalKind};
use stakenet_types::{Address, Timestamp};
use tracing::info;

impl StakingLedger {
    /// Execute the caller's withdrawal request `wr_id` once both the time
    /// and epoch delays for its kind have elapsed.
    ///
    /// Funds tied to a validator marked as a cheater are diverted to the
    /// slashed accumulators instead of being paid out; the request is
    /// consumed either way.
    pub fn withdraw_by_request(
        &mut self,
        caller: Address,
        now: Timestamp,
        wr_id: u64,
    ) -> Result<Option<Transfer>, StakingError> {
        let request = *self
            .withdrawal_request(&caller, wr_id)
            .ok_or(StakingError::RequestNotFound)?;
        let (period_time, period_epochs) = match request.kind {
            WithdrawalKind::Stake { .. } => (
                self.params.stake_lock_period_time,
                self.params.stake_lock_period_epochs,
            ),
            WithdrawalKind::Delegation { .. } => (
                self.params.delegation_lock_period_time,
                self.params.delegation_lock_period_epochs,
            ),
        };
        self.check_unlock_delays(now, request.time, request.epoch, period_time, period_epochs)?;

        let requests = self.withdrawal_requests.get_mut(&caller).expect("found above");
        requests.remove(&wr_id);
        if requests.is_empty() {
            self.withdrawal_requests.remove(&caller);
        }
        self.emit_refreshed(caller);

        let staker_id = match request.kind {
            WithdrawalKind::Stake { staker_id } | WithdrawalKind::Delegation { staker_id } => {
                staker_id
            }
        };
        if self.cheaters.contains(&staker_id) {
            match request.kind {
                WithdrawalKind::Stake { .. } => self.slashed_stake_total_amount += request.amount,
                WithdrawalKind::Delegation { .. } => {
                    self.slashed_delegations_total_amount += request.amount
                }
            }
            info!(
                target: "staking",
                "{} executed request {}: {} wei slashed (staker {} cheated)",
                caller, wr_id, request.amount, staker_id
            );
            Ok(None)
        } else {
            info!(
                target: "staking",
                "{} executed request {}: {} wei returned", caller, wr_id, request.amount
            );
            Ok(Some(Transfer {
                to: caller,
                amount: request.amount,
            }))
        }
    }

    /// Alias of [`withdraw_by_request`](Self::withdraw_by_request) kept for
    /// callers that distinguish partial withdrawals at the API surface.
    pub fn partial_withdraw_by_request(
        &mut self,
        caller: Address,
        now: Timestamp,
        wr_id: u64,
    ) -> Result<Option<Transfer>, StakingError> {
        self.withdraw_by_request(caller, now, wr_id)
    }
}
