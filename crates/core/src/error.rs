//! Error types for SurtGrid

use thiserror::Error;

/// Main error type for SurtGrid operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Buffer size mismatch: expected {expected} values, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Bad option combination or malformed option text. Raised before any
    /// processing starts.
    #[error("Usage error: {0}")]
    Usage(String),

    /// Extraction failure scoped to one input layer.
    #[error("Layer '{layer}': {reason}")]
    Layer { layer: String, reason: String },

    #[error("Cannot allocate working buffer of {bytes} bytes")]
    Allocation { bytes: usize },

    /// The progress callback asked to stop.
    #[error("User terminated")]
    Cancelled,

    #[error("Vector data error: {0}")]
    Vector(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors caused by how the job was configured.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_) | Error::InvalidParameter { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Result type alias for SurtGrid operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::Usage("x".into()).is_usage());
        assert!(Error::InvalidParameter {
            name: "power",
            value: "abc".into(),
            reason: "not a number".into(),
        }
        .is_usage());
        assert!(!Error::Cancelled.is_usage());
        assert!(Error::Cancelled.is_cancelled());
        assert_eq!(Error::Cancelled.to_string(), "User terminated");
    }
}
