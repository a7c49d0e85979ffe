//! Error types for the correction engine

use thiserror::Error;

/// Error type for engine operations.
///
/// Batch-correction failures and rule-predicate failures are deliberately
/// absent: both are recovered locally (fallback to originals, skip the rule)
/// and never surface to the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input text was empty or whitespace-only
    #[error("Input text is empty")]
    InputEmpty,

    /// The tagging collaborator is unavailable; offsets cannot be trusted
    /// without it, so the whole request fails
    #[error("Tagging dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Rule file could not be parsed or referenced an unknown condition
    #[error("Rule configuration error: {0}")]
    RuleConfig(String),

    /// Unexpected failure while assembling the issue list
    #[error("Internal assembly error: {0}")]
    Assembly(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
