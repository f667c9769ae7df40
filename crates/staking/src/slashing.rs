//! Marking validators as cheaters and diverting their funds.

use crate::errors::StakingError;
use crate::ledger::StakingLedger;
use stakenet_types::{Address, StakerId};
use tracing::warn;

impl StakingLedger {
    /// Whether the staker id is flagged as a cheater.
    ///
    /// The flag outlives the staker record, so funds still queued against a
    /// withdrawn cheater stay diverted.
    pub fn is_cheater(&self, staker_id: StakerId) -> bool {
        self.cheaters.contains(&staker_id)
    }

    /// Flag or unflag a staker as a cheater (owner only).
    ///
    /// A flagged staker is excluded from future epoch snapshots, cannot
    /// accept new delegations, and both its stake and its delegations are
    /// diverted to the slashed accumulators on withdrawal.
    pub fn mark_cheater(
        &mut self,
        caller: Address,
        staker_id: StakerId,
        cheater: bool,
    ) -> Result<(), StakingError> {
        self.require_owner(&caller)?;
        let staker = self
            .stakers
            .get_mut(&staker_id)
            .ok_or(StakingError::StakerNotFound)?;
        staker.is_cheater = cheater;
        let staker_owner = staker.owner;
        if cheater {
            self.cheaters.insert(staker_id);
            warn!(target: "staking", "staker {} marked as cheater", staker_id);
        } else {
            self.cheaters.remove(&staker_id);
            warn!(target: "staking", "staker {} cleared of cheating", staker_id);
        }
        self.emit_recalculated(staker_owner);
        let depositors: Vec<Address> = self
            .delegations
            .values()
            .filter(|delegation| delegation.to_staker_id == staker_id)
            .map(|delegation| delegation.depositor)
            .collect();
        for depositor in depositors {
            self.emit_recalculated(depositor);
        }
        Ok(())
    }
}
