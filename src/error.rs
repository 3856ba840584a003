use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used across the layout engine.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// The layout engine's error type.
///
/// Every operation here is a deterministic computation over an already
/// valid or already invalid input, so none of these are retryable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// A layer spec is malformed: a zero dimension, a zero stride, or a
    /// spec handed to an initializer of a different family.
    InvalidConfiguration {
        family: &'static str,
        what: &'static str,
    },

    /// The flat buffer holds fewer elements than the layout needs.
    BufferTooSmall {
        family: &'static str,
        got: usize,
        expected: usize,
    },

    /// The planner's segment lengths do not sum to the counter's total.
    ///
    /// Unreachable for the built-in families; kept as a guard for
    /// externally registered ones.
    ShapeMismatch {
        family: &'static str,
        planned: usize,
        counted: usize,
    },

    /// No initializer was registered under the given family tag.
    UnknownLayerFamily { tag: String },
}

impl Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::InvalidConfiguration { family, what } => {
                write!(f, "invalid {family} configuration: {what}")
            }
            LayoutError::BufferTooSmall {
                family,
                got,
                expected,
            } => {
                write!(
                    f,
                    "flat buffer for {family} holds {got} elements, the layout needs {expected}"
                )
            }
            LayoutError::ShapeMismatch {
                family,
                planned,
                counted,
            } => {
                write!(
                    f,
                    "planner and counter disagree for {family}: planned {planned} elements, counted {counted}"
                )
            }
            LayoutError::UnknownLayerFamily { tag } => {
                write!(f, "no parameter initializer registered for family {tag:?}")
            }
        }
    }
}

impl Error for LayoutError {}
