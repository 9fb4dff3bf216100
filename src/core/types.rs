//! Core type definitions for loaded examples

use crate::core::{MlioError, Result};
use ndarray::{Array1, ArrayD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sparse feature vector as parallel value/index lists
///
/// Indices are the 1-based feature ids exactly as they appear in the source
/// line, kept in token order (not sorted, not deduplicated).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    /// Feature values
    pub values: Vec<f64>,
    /// 1-based feature indices
    pub indices: Vec<usize>,
}

impl SparseVector {
    /// Create a new sparse vector from parallel value and index lists
    pub fn new(values: Vec<f64>, indices: Vec<usize>) -> Result<Self> {
        if values.len() != indices.len() {
            return Err(MlioError::ShapeMismatch {
                expected: vec![indices.len()],
                actual: vec![values.len()],
            });
        }
        Ok(Self { values, indices })
    }

    /// Create an empty sparse vector
    pub fn empty() -> Self {
        Self::default()
    }

    /// Largest 1-based index present, 0 when the vector is empty
    pub fn max_index(&self) -> usize {
        self.indices.iter().copied().max().unwrap_or(0)
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Check if vector is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Scatter into a zeroed dense vector of `input_size` entries
    ///
    /// Index `i` lands at position `i - 1`. An index past `input_size` is an
    /// error rather than a resize.
    pub fn to_dense(&self, input_size: usize) -> Result<Array1<f64>> {
        let mut dense = Array1::<f64>::zeros(input_size);
        for (&index, &value) in self.indices.iter().zip(self.values.iter()) {
            if index == 0 || index > input_size {
                return Err(MlioError::IndexOutOfRange {
                    index,
                    size: input_size,
                });
            }
            dense[index - 1] = value;
        }
        Ok(dense)
    }
}

/// Element type of a materialized buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    F32,
    F64,
    I32,
    I64,
}

/// Shape of one field of an example
///
/// `Scalar` fields are stored one value per example and yielded back as
/// scalars, never as length-1 arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    Scalar,
    Array(Vec<usize>),
}

impl FieldShape {
    pub fn array(dims: &[usize]) -> Self {
        FieldShape::Array(dims.to_vec())
    }

    /// Dimensions of one row of the field (empty for scalars)
    pub fn dims(&self) -> &[usize] {
        match self {
            FieldShape::Scalar => &[],
            FieldShape::Array(dims) => dims,
        }
    }
}

/// A typed scalar read back from a materialized buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    F32(f32),
    F64(f64),
    I32(i32),
    I64(i64),
}

impl Scalar {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::F32(v) => v as f64,
            Scalar::F64(v) => v,
            Scalar::I32(v) => v as f64,
            Scalar::I64(v) => v as f64,
        }
    }
}

/// One field of an example, as produced by a loader or line converter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Field {
    Float(f64),
    Int(i64),
    Text(String),
    Array(ArrayD<f64>),
}

impl Field {
    /// Shape of the field value (empty for scalars and text)
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Field::Array(array) => array.shape().to_vec(),
            _ => Vec::new(),
        }
    }

    /// Numeric value of a scalar-like field
    ///
    /// Text is parsed as a float, and a single-element array counts as a
    /// scalar.
    pub fn to_scalar(&self) -> Result<f64> {
        match self {
            Field::Float(v) => Ok(*v),
            Field::Int(v) => Ok(*v as f64),
            Field::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                MlioError::ConversionError(format!("Cannot convert '{}' to a number", s))
            }),
            Field::Array(array) => match array.iter().next() {
                Some(&v) if array.len() == 1 => Ok(v),
                _ => Err(MlioError::ShapeMismatch {
                    expected: Vec::new(),
                    actual: array.shape().to_vec(),
                }),
            },
        }
    }
}

impl From<f64> for Field {
    fn from(v: f64) -> Self {
        Field::Float(v)
    }
}

impl From<i64> for Field {
    fn from(v: i64) -> Self {
        Field::Int(v)
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Text(s)
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Text(s.to_string())
    }
}

impl From<ArrayD<f64>> for Field {
    fn from(array: ArrayD<f64>) -> Self {
        Field::Array(array)
    }
}

impl From<Array1<f64>> for Field {
    fn from(array: Array1<f64>) -> Self {
        Field::Array(array.into_dyn())
    }
}

impl From<Scalar> for Field {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::F32(v) => Field::Float(v as f64),
            Scalar::F64(v) => Field::Float(v),
            Scalar::I32(v) => Field::Int(v as i64),
            Scalar::I64(v) => Field::Int(v),
        }
    }
}

impl From<Vec<f64>> for Field {
    fn from(values: Vec<f64>) -> Self {
        Field::Array(Array1::from(values).into_dyn())
    }
}

/// A row-like example fed to the in-memory materializer
///
/// Single-field datasets hand over the field value directly; multi-field
/// datasets hand over one value per field, in field order.
#[derive(Debug, Clone, PartialEq)]
pub enum Example {
    Single(Field),
    Fields(Vec<Field>),
}

impl Example {
    /// Number of fields carried by the example
    pub fn n_fields(&self) -> usize {
        match self {
            Example::Single(_) => 1,
            Example::Fields(fields) => fields.len(),
        }
    }
}

/// Metadata computed when loading an ascii file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsciiMetadata {
    /// Number of input columns (excluding the target column, if any)
    pub input_size: usize,
}

/// Metadata computed when loading a libsvm file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibSvmMetadata<T: Ord> {
    /// Distinct converted targets seen in the file
    pub targets: BTreeSet<T>,
    /// Dimensionality of the feature space
    pub input_size: usize,
}
