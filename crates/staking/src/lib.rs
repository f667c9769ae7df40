//! Stakenet Staking — the economic backbone of a proof-of-stake network.
//!
//! Tracks validator self-stake and delegated stake, accrues per-epoch
//! rewards, enforces voluntary lock-up incentives, computes early-withdrawal
//! penalties and slashes misbehaving validators.
//!
//! The ledger is a single aggregate root ([`StakingLedger`]); every public
//! operation takes an explicit caller identity and, where time matters, an
//! explicit wall clock. Operations either complete atomically or fail with a
//! [`StakingError`] leaving no partial state behind. Balance movements are
//! reported back as [`Transfer`] effects rather than applied to an external
//! wallet.
//!
//! Monetary unit: wei (1 token = 10^18 wei). All ratios are fixed-point
//! parts-per-[`RATIO_UNIT`](stakenet_types::RATIO_UNIT); no floats.

pub mod delegation;
pub mod epoch;
pub mod errors;
pub mod ledger;
pub mod lockup;
mod math;
pub mod params;
pub mod penalty;
pub mod records;
pub mod rewards;
pub mod slashing;
pub mod stake;
pub mod withdrawal;

#[cfg(test)]
pub(crate) mod testutil;

pub use epoch::{EpochSnapshot, ValidatorWeight};
pub use errors::StakingError;
pub use ledger::{LedgerEvent, StakingLedger};
pub use params::EconomicParams;
pub use records::{
    Delegation, Lockup, RewardSplit, Staker, Transfer, WithdrawalKind, WithdrawalRequest,
};
pub use rewards::ClaimPreview;
