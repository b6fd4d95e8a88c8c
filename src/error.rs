use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NnError>;

/// Errors raised by matrix arithmetic and network operations.
///
/// Shape errors indicate a misconfigured topology; they abort the current
/// call and are never retried.
#[derive(Error, Debug)]
pub enum NnError {
    /// Operand shapes are incompatible for `op`.
    #[error("shape mismatch in {op}: {left:?} vs {right:?}")]
    ShapeMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// A constructor or operation received an unusable argument
    /// (zero dimension, empty batch, mismatched value count).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("index ({row}, {col}) out of bounds for {rows}x{cols} matrix")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NnError {
    pub(crate) fn shape(op: &'static str, left: (usize, usize), right: (usize, usize)) -> Self {
        NnError::ShapeMismatch { op, left, right }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        NnError::InvalidArgument(msg.into())
    }
}
