//! Shared helpers for unit tests.

use crate::ledger::StakingLedger;
use crate::params::EconomicParams;
use stakenet_types::{Address, ADDRESS_BYTES, WEI_PER_TOKEN};

/// Deterministic test address: the byte `n` repeated.
pub(crate) fn addr(n: u8) -> Address {
    Address([n; ADDRESS_BYTES])
}

/// The ledger owner used throughout the unit tests.
pub(crate) fn owner() -> Address {
    addr(0xee)
}

/// Fresh ledger with default parameters and a large total supply.
pub(crate) fn ledger_with_defaults() -> StakingLedger {
    StakingLedger::new(owner(), EconomicParams::default(), 1_000_000 * WEI_PER_TOKEN).unwrap()
}
