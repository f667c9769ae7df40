//! Economic parameters of the ledger.

use crate::errors::StakingError;
use serde::{Deserialize, Serialize};
use stakenet_types::{Ratio, Wei, RATIO_UNIT, WEI_PER_TOKEN};

/// Economic parameters governing stake minimums, reward rates, lockups and
/// withdrawal delays.
///
/// The defaults are the reference network constants; every field is
/// adjustable so economically contested values (the unlocked-reward ratio,
/// the penalty shares) stay configuration rather than code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicParams {
    /// Minimum self-stake to create a validator, in wei.
    pub min_stake: Wei,
    /// Minimum amount to create a delegation, in wei.
    pub min_delegation: Wei,
    /// Minimum granularity of stake top-ups and partial stake withdrawals.
    pub min_stake_decrease: Wei,
    /// Minimum granularity of delegation top-ups.
    pub min_delegation_increase: Wei,
    /// Maximum delegated-to-self-stake ratio, parts-per-`RATIO_UNIT`
    /// (15_000_000 = 15x the self-stake).
    pub max_delegated_ratio: Ratio,
    /// Validator commission on delegated rewards, parts-per-`RATIO_UNIT`.
    pub validator_commission: Ratio,
    /// Wall-clock delay between stake deactivation and withdrawal, seconds.
    pub stake_lock_period_time: u64,
    /// Sealed epochs required between stake deactivation and withdrawal.
    pub stake_lock_period_epochs: u64,
    /// Wall-clock delay between delegation deactivation and withdrawal.
    pub delegation_lock_period_time: u64,
    /// Sealed epochs required between delegation deactivation and withdrawal.
    pub delegation_lock_period_epochs: u64,
    /// Minimum voluntary lockup duration, seconds.
    pub min_lockup_duration: u64,
    /// Maximum voluntary lockup duration, seconds.
    pub max_lockup_duration: u64,
    /// Share of the full epoch reward paid to unlocked accounts once the
    /// lockup feature is active, parts-per-`RATIO_UNIT`. The remainder is
    /// burnt.
    pub unlocked_reward_ratio: Ratio,
    /// Share of the lockup base reward charged as early-withdrawal penalty.
    pub lockup_base_penalty_share: Ratio,
    /// Share of the lockup extra reward charged as early-withdrawal penalty.
    pub lockup_extra_penalty_share: Ratio,
    /// Reward pool accrued per second of epoch duration, in wei.
    pub base_reward_per_second: Wei,
}

impl Default for EconomicParams {
    fn default() -> Self {
        Self {
            min_stake: WEI_PER_TOKEN,      // 1.0
            min_delegation: WEI_PER_TOKEN, // 1.0
            min_stake_decrease: WEI_PER_TOKEN / 10,
            min_delegation_increase: WEI_PER_TOKEN / 10,
            max_delegated_ratio: 15_000_000, // 15x
            validator_commission: 150_000,   // 15%
            stake_lock_period_time: 86_400 * 7,
            stake_lock_period_epochs: 3,
            delegation_lock_period_time: 86_400 * 7,
            delegation_lock_period_epochs: 3,
            min_lockup_duration: 86_400 * 14,
            max_lockup_duration: 86_400 * 365,
            unlocked_reward_ratio: 300_000,       // 30%
            lockup_base_penalty_share: 500_000,   // 50%
            lockup_extra_penalty_share: 1_000_000, // 100%
            base_reward_per_second: 100_000_000,
        }
    }
}

impl EconomicParams {
    /// Validate internal consistency of the parameter set.
    pub fn validate(&self) -> Result<(), StakingError> {
        if self.min_stake == 0 {
            return Err(StakingError::InvalidParameter("min_stake must be nonzero"));
        }
        if self.min_delegation == 0 {
            return Err(StakingError::InvalidParameter(
                "min_delegation must be nonzero",
            ));
        }
        if self.validator_commission > RATIO_UNIT {
            return Err(StakingError::InvalidParameter(
                "validator_commission exceeds RATIO_UNIT",
            ));
        }
        if self.unlocked_reward_ratio > RATIO_UNIT {
            return Err(StakingError::InvalidParameter(
                "unlocked_reward_ratio exceeds RATIO_UNIT",
            ));
        }
        if self.lockup_base_penalty_share > RATIO_UNIT
            || self.lockup_extra_penalty_share > RATIO_UNIT
        {
            return Err(StakingError::InvalidParameter(
                "penalty share exceeds RATIO_UNIT",
            ));
        }
        if self.min_lockup_duration == 0 || self.min_lockup_duration > self.max_lockup_duration {
            return Err(StakingError::InvalidParameter(
                "lockup duration bounds are inverted",
            ));
        }
        if self.max_delegated_ratio < RATIO_UNIT {
            return Err(StakingError::InvalidParameter(
                "max_delegated_ratio below 1x",
            ));
        }
        Ok(())
    }
}
