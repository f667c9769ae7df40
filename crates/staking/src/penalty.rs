//! Early-withdrawal penalties for broken delegation locks.
//!
//! Claiming rewards for a locked epoch books a penalty quote into a
//! per-depositor accumulator: half of the base part plus the whole extra
//! part. Nothing is owed while the lock runs its course; the accumulator is
//! charged only when the depositor withdraws before the lock expires, pro
//! rata for partial withdrawals and never more than the amount withdrawn.

use crate::ledger::StakingLedger;
use crate::math::mul_div;
use stakenet_types::{Address, Timestamp, Wei};

impl StakingLedger {
    /// Penalty quote accrued so far by the depositor's claims over locked
    /// epochs. Informational; charged only on an early exit.
    pub fn delegation_early_withdrawal_penalty(&self, depositor: &Address) -> Wei {
        self.early_withdrawal_penalties
            .get(depositor)
            .copied()
            .unwrap_or(0)
    }

    /// Penalty that withdrawing `withdraw_amount` wei at `now` would cost.
    ///
    /// Zero once the lock has expired (or none exists): waiting out the
    /// lock always avoids the penalty.
    pub fn calc_delegation_penalty(
        &self,
        depositor: &Address,
        now: Timestamp,
        withdraw_amount: Wei,
    ) -> Wei {
        self.pending_delegation_penalty(depositor, now, withdraw_amount)
    }

    pub(crate) fn pending_delegation_penalty(
        &self,
        depositor: &Address,
        now: Timestamp,
        withdraw_amount: Wei,
    ) -> Wei {
        let Some(delegation) = self.delegations.get(depositor) else {
            return 0;
        };
        let locked = delegation
            .lockup
            .map(|lock| lock.is_active(now))
            .unwrap_or(false);
        if !locked || delegation.amount == 0 {
            return 0;
        }
        let accrued = self.delegation_early_withdrawal_penalty(depositor);
        mul_div(accrued, withdraw_amount, delegation.amount).min(withdraw_amount)
    }
}
