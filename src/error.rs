use thiserror::Error;

/// Crate-wide error type.
///
/// Every failure in this crate is a graph-construction-time validation
/// error: it is raised synchronously while building or evaluating the
/// graph, and retrying the same call can never succeed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LossGraphError {
    /// Two operand shapes cannot be broadcast together.
    #[error("cannot broadcast shapes {left:?} and {right:?} in {operation}")]
    BroadcastError {
        left: Vec<usize>,
        right: Vec<usize>,
        operation: String,
    },

    /// An operand has a shape other than the one the operation requires.
    #[error("shape mismatch in {operation}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    /// A shape argument is invalid on its own (wrong element count,
    /// axis out of range, empty reduction, ...).
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// A configuration value is outside its documented domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A reduction policy name did not parse to a known variant.
    #[error("unsupported reduction policy '{0}'")]
    UnsupportedReduction(String),

    /// The tensor element type cannot represent a constant the
    /// operation needs (reduction divisor, epsilon, delta, ...).
    #[error("element type cannot represent a constant required by {operation}")]
    UnsupportedElementType { operation: String },

    /// A node id was used with an engine that does not own it.
    #[error("node {0} not found in graph")]
    NodeNotFound(usize),

    /// An operator was applied to the wrong number of inputs.
    #[error("{operation} expects {expected} input(s), got {actual}")]
    InvalidInputCount {
        operation: String,
        expected: usize,
        actual: usize,
    },
}
