//! Dataset loading for machine learning experiments
//!
//! Reads whitespace-delimited ascii matrices and sparse libsvm files into
//! dense, sparse or streaming numeric structures, and persists arbitrary
//! serializable objects, optionally gzip-compressed.

pub mod core;
pub mod data;
pub mod persistence;
pub mod utils;

// Re-export main types for convenience
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{MlioError, Result};
pub use crate::data::{
    ascii_load, libsvm_load, load_from_file, load_line_default, AsciiData, AsciiOptions,
    DenseExample, FieldBuffer, FieldRows, FieldValue, FileDataset, LibSvmData, LibSvmExample,
    LibSvmLoader, LoadMode, MemoryDataset, MemoryItem, Representation, SparseExample,
};
pub use crate::persistence::{gload, gsave, load, save};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
