//! Dataset loaders and iteration adapters
//!
//! Loaders turn ascii and libsvm text into examples; [`FieldRows`],
//! [`MemoryDataset`] and [`FileDataset`] define how those examples are
//! consumed, either lazily or after materializing them into typed buffers.

pub mod ascii;
pub mod fields;
pub mod file;
pub mod libsvm;
pub mod memory;

pub use self::ascii::*;
pub use self::fields::*;
pub use self::file::*;
pub use self::libsvm::*;
pub use self::memory::*;
