use stakenet_types::EpochId;
use thiserror::Error;

/// Errors produced by ledger operations.
///
/// Every failure is atomic: the operation performs no state write and no
/// balance transfer before returning one of these. The display strings are
/// the user-visible revert reasons.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StakingError {
    // --- validation ---
    #[error("insufficient amount for staking")]
    InsufficientStake,
    #[error("insufficient amount for delegation")]
    InsufficientDelegation,
    #[error("too small amount")]
    TooSmallAmount,
    #[error("staker doesn't exist")]
    StakerNotFound,
    #[error("staker already exists")]
    StakerAlreadyExists,
    #[error("delegation doesn't exist")]
    DelegationNotFound,
    #[error("delegation already exists")]
    DelegationAlreadyExists,
    #[error("staker's limit is exceeded")]
    DelegatedLimitExceeded,
    #[error("request already exists")]
    RequestAlreadyExists,
    #[error("request doesn't exist")]
    RequestNotFound,

    // --- state ---
    #[error("staker is deactivated")]
    StakerDeactivated,
    #[error("staker wasn't deactivated")]
    StakerNotDeactivated,
    #[error("delegation is deactivated")]
    DelegationDeactivated,
    #[error("delegation wasn't deactivated")]
    DelegationNotDeactivated,
    #[error("staker is a cheater")]
    StakerIsCheater,
    #[error("stake is locked")]
    StakeIsLocked,
    #[error("already locked up")]
    AlreadyLockedUp,
    #[error("feature was not activated")]
    FeatureNotActivated,
    #[error("feature was started")]
    FeatureAlreadyStarted,
    #[error("not all rewards claimed")]
    NotAllRewardsClaimed,
    #[error("not all lockup rewards claimed")]
    NotAllLockupRewardsClaimed,

    // --- temporal ---
    #[error("not enough time passed")]
    NotEnoughTimePassed,
    #[error("not enough epochs passed")]
    NotEnoughEpochsPassed,
    #[error("future epoch {0}")]
    FutureEpoch(EpochId),
    #[error("invalid epoch range")]
    InvalidEpochRange,
    #[error("no epochs claimed")]
    NoEpochsClaimed,
    #[error("can't start in the past")]
    CannotStartInPast,
    #[error("incorrect duration")]
    IncorrectDuration,
    #[error("staker's locking will finish first")]
    StakerLockEndsFirst,

    // --- authorization ---
    #[error("caller is not the owner")]
    NotOwner,

    // --- configuration ---
    #[error("invalid economic parameter: {0}")]
    InvalidParameter(&'static str),
}
