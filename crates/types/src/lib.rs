//! Shared scalar types for the stakenet staking ledger.
//!
//! Monetary unit: wei. 1 token = 10^18 wei.

pub mod address;
pub mod scalars;

pub use address::*;
pub use scalars::*;
