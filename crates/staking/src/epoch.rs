//! Epoch sealing: freezing per-epoch aggregates for reward math.

use crate::ledger::StakingLedger;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use stakenet_types::{EpochId, StakerId, Timestamp, Wei};
use tracing::info;

/// Reward weight of a single validator inside a sealed epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorWeight {
    pub stake_amount: Wei,
    pub delegated_me: Wei,
}

impl ValidatorWeight {
    pub fn total(&self) -> Wei {
        self.stake_amount + self.delegated_me
    }
}

/// Immutable aggregate of one sealed epoch.
///
/// Accounts absent from `validators` earn nothing for the epoch; the table
/// holds every staker that was active and unslashed at sealing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSnapshot {
    pub epoch: EpochId,
    /// Wall clock at sealing; lockup coverage is checked against this.
    pub end_time: Timestamp,
    /// Seconds covered by the epoch.
    pub duration: u64,
    /// Total reward pool distributed over this epoch.
    pub epoch_reward: Wei,
    pub total_stake_amount: Wei,
    pub total_delegated_amount: Wei,
    /// Circulating supply at sealing, for bonded-ratio queries.
    pub total_supply: Wei,
    pub validators: HashMap<StakerId, ValidatorWeight>,
}

impl EpochSnapshot {
    /// Combined stake weight the reward pool is divided over.
    pub fn total_weight(&self) -> Wei {
        self.total_stake_amount + self.total_delegated_amount
    }
}

impl StakingLedger {
    /// Seal the epoch currently in progress with the given duration.
    ///
    /// The reward pool is `duration * base_reward_per_second`. Epochs are
    /// sealed strictly in order; none can be skipped or re-sealed.
    pub fn advance_epoch(&mut self, now: Timestamp, duration: u64) -> EpochId {
        let reward = (duration as Wei) * self.params.base_reward_per_second;
        self.advance_epoch_with_reward(now, duration, reward)
    }

    /// Seal the epoch currently in progress with an explicit reward pool.
    ///
    /// Networks that derive the pool from fees or emission schedules supply
    /// it here; [`advance_epoch`](Self::advance_epoch) is the fixed-rate
    /// convenience path.
    pub fn advance_epoch_with_reward(
        &mut self,
        now: Timestamp,
        duration: u64,
        epoch_reward: Wei,
    ) -> EpochId {
        let epoch = self.current_sealed_epoch + 1;

        let mut validators = HashMap::new();
        let mut total_stake = 0;
        let mut total_delegated = 0;
        for staker in self.stakers.values() {
            if !staker.is_active() || staker.is_cheater {
                continue;
            }
            total_stake += staker.stake_amount;
            total_delegated += staker.delegated_me;
            validators.insert(
                staker.id,
                ValidatorWeight {
                    stake_amount: staker.stake_amount,
                    delegated_me: staker.delegated_me,
                },
            );
        }

        self.snapshots.insert(
            epoch,
            EpochSnapshot {
                epoch,
                end_time: now,
                duration,
                epoch_reward,
                total_stake_amount: total_stake,
                total_delegated_amount: total_delegated,
                total_supply: self.total_supply,
                validators,
            },
        );
        self.current_sealed_epoch = epoch;

        info!(
            target: "staking",
            "sealed epoch {} over {}s: reward pool {} wei, {} validators, weight {}",
            epoch,
            duration,
            epoch_reward,
            self.snapshots[&epoch].validators.len(),
            self.snapshots[&epoch].total_weight()
        );

        epoch
    }

    /// The sealed snapshot for `epoch`, if it exists. Epoch 0 never does.
    pub fn epoch_snapshot(&self, epoch: EpochId) -> Option<&EpochSnapshot> {
        self.snapshots.get(&epoch)
    }
}
