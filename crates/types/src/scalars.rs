//! Deterministic fixed-point helpers for representing ratios without floats.
//!
//! Ratios are stored as parts-per-`RATIO_UNIT` (`1_000_000`) so that
//! `1.0 == 1_000_000` and `0.15 == 150_000`. All ledger math is integer
//! floor division; no floats appear anywhere in reward or penalty code.

use core::fmt;

/// Balance in wei. 1 token = 10^18 wei.
pub type Wei = u128;

/// Sealed-epoch index. Epoch 0 is the genesis marker and carries no reward.
pub type EpochId = u64;

/// Dense sequential staker handle, assigned from 1, never reused.
pub type StakerId = u64;

/// Wall-clock time in unix seconds, always supplied by the caller.
pub type Timestamp = u64;

/// Number of wei in one whole token.
pub const WEI_PER_TOKEN: Wei = 1_000_000_000_000_000_000;

/// Fixed-point ratio in parts-per-million.
pub type Ratio = u64;

/// Scale applied to ratio values (one million parts == 1.0).
pub const RATIO_UNIT: Ratio = 1_000_000;

/// Compute a ratio from two integers using deterministic fixed-point math.
///
/// Returns a value clamped to `[0, RATIO_UNIT]`.
pub fn ratio_from_parts(numerator: u128, denominator: u128) -> Ratio {
    if denominator == 0 {
        return 0;
    }

    let scaled = numerator.saturating_mul(RATIO_UNIT as u128) / denominator;
    scaled.min(RATIO_UNIT as u128) as Ratio
}

/// Clamp the provided ratio to the valid `[0, RATIO_UNIT]` range.
pub fn clamp_ratio(value: Ratio) -> Ratio {
    value.min(RATIO_UNIT)
}

/// Format a wei amount as a decimal token string with 18 fractional digits.
pub fn format_wei(amount: Wei) -> WeiDisplay {
    WeiDisplay { amount }
}

/// Display helper returned by [`format_wei`].
pub struct WeiDisplay {
    amount: Wei,
}

impl fmt::Display for WeiDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.amount / WEI_PER_TOKEN;
        let fractional = self.amount % WEI_PER_TOKEN;
        write!(f, "{whole}.{fractional:018}")
    }
}
