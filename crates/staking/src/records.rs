//! Account records stored inside the ledger.

use serde::{Deserialize, Serialize};
use stakenet_types::{Address, EpochId, StakerId, Timestamp, Wei};

/// A voluntary lock of stake or delegation in exchange for full rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockup {
    /// First epoch the lock applies to (the epoch in progress when locking).
    pub from_epoch: EpochId,
    /// Wall-clock time the lock expires.
    pub end_time: Timestamp,
    /// Committed duration in seconds.
    pub duration: u64,
}

impl Lockup {
    /// Whether the lock is still running at `now`.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.end_time > now
    }
}

/// A validator identity holding self-stake and accepting delegations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staker {
    /// Dense sequential handle, never reused.
    pub id: StakerId,
    pub owner: Address,
    /// Opaque application metadata supplied at creation.
    pub metadata: Vec<u8>,
    pub stake_amount: Wei,
    /// Sum of active delegations bound to this staker.
    pub delegated_me: Wei,
    pub created_epoch: EpochId,
    pub created_time: Timestamp,
    /// Zero while active; the epoch a withdrawal was prepared otherwise.
    pub deactivated_epoch: EpochId,
    pub deactivated_time: Timestamp,
    pub is_cheater: bool,
    /// Claim watermark: rewards are settled through this sealed epoch.
    pub paid_until_epoch: EpochId,
    pub lockup: Option<Lockup>,
}

impl Staker {
    /// A staker is active until a full withdrawal has been prepared.
    pub fn is_active(&self) -> bool {
        self.deactivated_epoch == 0
    }
}

/// Funds contributed by a depositor to exactly one staker at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delegation {
    pub depositor: Address,
    pub to_staker_id: StakerId,
    pub amount: Wei,
    pub created_epoch: EpochId,
    pub created_time: Timestamp,
    pub deactivated_epoch: EpochId,
    pub deactivated_time: Timestamp,
    pub paid_until_epoch: EpochId,
    pub lockup: Option<Lockup>,
}

impl Delegation {
    pub fn is_active(&self) -> bool {
        self.deactivated_epoch == 0
    }
}

/// What a queued withdrawal request releases when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalKind {
    /// Part of a validator's self-stake.
    Stake { staker_id: StakerId },
    /// Part of a delegation bound to the given staker.
    Delegation { staker_id: StakerId },
}

/// A partial-withdrawal intent, consumed exactly once after the dual
/// time/epoch delay has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub kind: WithdrawalKind,
    /// Amount credited at request time (already penalty-reduced for early
    /// delegation exits).
    pub amount: Wei,
    /// Epoch in progress when the request was created.
    pub epoch: EpochId,
    /// Wall clock when the request was created.
    pub time: Timestamp,
}

/// Four-way reward decomposition for an epoch range once the lockup feature
/// is active. `unlocked + lockup_base + lockup_extra` is payable; `burnt` is
/// withheld forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSplit {
    pub unlocked: Wei,
    pub lockup_base: Wei,
    pub lockup_extra: Wei,
    pub burnt: Wei,
}

impl RewardSplit {
    /// The portion actually paid out by a claim.
    pub fn payable(&self) -> Wei {
        self.unlocked + self.lockup_base + self.lockup_extra
    }

    pub(crate) fn accumulate(&mut self, other: RewardSplit) {
        self.unlocked += other.unlocked;
        self.lockup_base += other.lockup_base;
        self.lockup_extra += other.lockup_extra;
        self.burnt += other.burnt;
    }
}

/// A balance movement out of the ledger, to be applied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to: Address,
    pub amount: Wei,
}
