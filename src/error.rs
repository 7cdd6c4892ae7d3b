use thiserror::Error;

/// Internal error type threaded between pipeline stages.
///
/// `solve` never returns this directly — it is caught at the one call site
/// in `lib.rs` and mapped onto [`crate::model::SolveStatus`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no feasible solution exists")]
    Infeasible,

    #[error("solver deadline reached with no candidates")]
    TimedOut,

    #[error("solve was cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}
