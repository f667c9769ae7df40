//! Stakenet Governance — voting power derived from the staking ledger.
//!
//! Governance weighs votes by bonded funds. This crate provides the read
//! side: [`StakeReader`] turns a ledger into per-account voting power, and
//! [`VotingPowerCache`] memoizes it per proposal, invalidated by the
//! [`LedgerEvent`](stakenet_staking::LedgerEvent) stream the ledger emits.

pub mod cache;
pub mod power;

pub use cache::{ProposalId, VotingPowerCache};
pub use power::StakeReader;
