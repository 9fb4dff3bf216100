//! Error types for dataset loading and persistence

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MlioError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Index out of range: index {index} does not fit in size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Conversion error: {0}")]
    ConversionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<MlioError>,
    },
}

impl MlioError {
    /// Attach a 1-based line number to an error raised while reading a file
    pub fn at_line(self, line: usize) -> Self {
        MlioError::Line {
            line,
            source: Box::new(self),
        }
    }

    /// The underlying error, with any line annotation peeled off
    pub fn root(&self) -> &MlioError {
        match self {
            MlioError::Line { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, MlioError>;
