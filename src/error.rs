//! Error taxonomy for the fraud network pipeline.
//!
//! Only two conditions ever abort a request: malformed input and the loss of
//! every scoring stage. Everything else degrades into the aggregated verdict.

use thiserror::Error;

/// Graph query failure for an id that was never seen at build time.
///
/// This is an expected condition, not a system fault: the orchestrator
/// substitutes a neutral out-of-network result instead of propagating it.
#[derive(Debug, Error)]
pub enum GraphQueryError {
    #[error("node {0} not found in relationship graph")]
    NodeNotFound(String),
}

/// Graph cache load/store failure. Always recoverable: callers fall back to a
/// full rebuild and never surface this to the pipeline caller.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache snapshot malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("cache snapshot inconsistent: {0}")]
    Inconsistent(String),
}

/// Hard abort of one pipeline request.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required identifying fields could not be produced at normalization.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// A scoring stage rejected the request as malformed.
    #[error("stage {stage} rejected input: {message}")]
    StageValidation { stage: String, message: String },

    /// Every scoring stage failed; there is nothing to aggregate.
    #[error("all scoring stages failed")]
    AllStagesFailed,
}
