use btc_types::header::TargetError;
use thiserror::Error;

/// Reasons a state transition is rejected. The transition is atomic: any of
/// these aborts it with no partial acceptance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error("header hash exceeds its target")]
    InvalidPoW,
    #[error("compact bits out of range")]
    BitsOutOfRange,
    #[error("target above proof-of-work limit")]
    TargetAbovePowLimit,
    #[error("unexpected difficulty: expected bits {expected:#010x}, got {actual:#010x}")]
    BadDifficulty { expected: u32, actual: u32 },
    #[error("timestamp not above median-time-past or too far in the future")]
    BadTimestamp,
    #[error("block version below the minimum")]
    OutdatedVersion,
    #[error("parent block not found")]
    UnknownParent,
    #[error("duplicate header in submission")]
    DuplicateInBatch,
    #[error("fork submitted without a canonical extension")]
    MissingCanonicalExtension,
    #[error("empty submission")]
    EmptySubmission,
    #[error("chainwork accumulator overflow")]
    ChainworkOverflow,
    #[error("recomputed state differs from the claimed next state")]
    StateMismatch,
    #[error("redeemer time out of tolerance with the validity interval")]
    TimeOutOfTolerance,
    #[error("validity interval lower bound is not finite")]
    NonFiniteValidity,
    #[error("input datum hash does not match the prior state")]
    InputDatumMismatch,
    #[error("continuing output missing or not unique")]
    OutputShape,
}

impl From<TargetError> for UpdateError {
    fn from(err: TargetError) -> Self {
        match err {
            TargetError::BitsOutOfRange => UpdateError::BitsOutOfRange,
            TargetError::AbovePowLimit => UpdateError::TargetAbovePowLimit,
        }
    }
}
