//! Error types for advantage estimation and batch adaptation.

use thiserror::Error;

/// Errors surfaced by the dispatch layer, the batch adapters and the toy
/// simulation.
///
/// The numeric primitives themselves never return errors: degenerate
/// statistics are handled by epsilon flooring or by zero-by-convention
/// contributions.
#[derive(Debug, Error)]
pub enum DcaError {
    /// An advantage mode string outside the closed set.
    #[error("unknown advantage mode '{given}': must be one of {valid}")]
    UnknownMode {
        /// The string that failed to parse.
        given: String,
        /// Comma-separated list of accepted modes.
        valid: &'static str,
    },

    /// Per-response arrays that cannot be lined up with the group.
    #[error("shape mismatch for '{field}': expected at least {expected} values, got {actual}")]
    ShapeMismatch {
        /// Which input array was too short.
        field: &'static str,
        /// Minimum number of values required.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// A group size that is zero or does not divide the flat batch length.
    #[error("invalid group size {group_size} for {total} responses")]
    InvalidGroupSize {
        /// Requested group size G.
        group_size: usize,
        /// Total number of responses N in the flat batch.
        total: usize,
    },

    /// A group with no responses.
    #[error("cannot compute advantages for an empty group")]
    EmptyGroup,

    /// A reward or length that is NaN or infinite, or an advantage that
    /// overflowed while being computed.
    #[error("non-finite value in '{field}' at index {index}")]
    NonFinite {
        /// Which array held the value.
        field: &'static str,
        /// Position of the offending value.
        index: usize,
    },

    /// A batch dictionary without a required key.
    #[error("batch is missing required key '{0}'")]
    MissingKey(String),

    /// A batch value with the wrong JSON type or nesting.
    #[error("invalid batch value for '{key}': {reason}")]
    InvalidBatch {
        /// Batch key whose value was rejected.
        key: String,
        /// Human-readable description of the problem.
        reason: String,
    },

    /// A configuration document that failed to parse.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Invalid parameters for the toy length simulation.
    #[error("simulation error: {0}")]
    Simulation(String),
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, DcaError>;
