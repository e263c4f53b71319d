use thiserror::Error;

/// Fatal raffle outcomes. Transient provider failures never surface here;
/// they are absorbed by the stage that hits them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RaffleError {
    #[error("no eligible addresses hold a positive balance")]
    EmptyPool,

    /// Unreachable through the normal pipeline (the aggregator drops
    /// zero-weight holders), but the sampler accepts pools from any source
    /// and must check independently.
    #[error("pool is non-empty but its weights sum to zero")]
    ZeroTotalWeight,
}
