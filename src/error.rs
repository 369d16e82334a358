use thiserror::Error;

/// Errors produced by the recommendation engine and the bankroll ledger.
///
/// Only `Persistence` must reach the user as a hard failure; the other
/// variants degrade to logged, reduced output (fewer matches analysed) or to
/// a rejected request that performed no mutation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed or missing upstream data. The affected match is skipped.
    #[error("data error: {0}")]
    Data(String),

    /// Bad stake / outcome / probability / odds passed by a caller.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The ledger could not be durably written.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The match-data provider could not be reached.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl EngineError {
    pub fn data(msg: impl Into<String>) -> Self {
        EngineError::Data(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidArgument(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        EngineError::Persistence(msg.into())
    }

    /// Whether the error must be reported to the user instead of being
    /// absorbed into a smaller result set.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Persistence(_))
    }
}
