//! In-memory materialization of row-like datasets
//!
//! [`MemoryDataset`] consumes any finite, re-iterable source of examples and
//! copies every field into its own fixed-shape typed buffer. Iterating the
//! dataset afterwards only reads from those buffers.

use crate::core::{DType, Example, Field, FieldShape, IntoExample, MlioError, Result, Scalar};
use log::{debug, warn};
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Axis, IxDyn};

/// Numeric element that can be written into a field buffer
trait Element: Copy + Default {
    fn from_f64(v: f64) -> Result<Self>;
}

impl Element for f32 {
    fn from_f64(v: f64) -> Result<Self> {
        if v.is_finite() && v.abs() > f32::MAX as f64 {
            return Err(MlioError::ConversionError(format!(
                "{} does not fit in float32",
                v
            )));
        }
        Ok(v as f32)
    }
}

impl Element for f64 {
    fn from_f64(v: f64) -> Result<Self> {
        Ok(v)
    }
}

impl Element for i32 {
    fn from_f64(v: f64) -> Result<Self> {
        checked_integral(v, i32::MIN as f64, i32::MAX as f64, "int32").map(|v| v as i32)
    }
}

impl Element for i64 {
    fn from_f64(v: f64) -> Result<Self> {
        // i64::MAX rounds up to 2^63 as a float, which is already out of range
        if v >= i64::MAX as f64 {
            return Err(MlioError::ConversionError(format!(
                "{} does not fit in int64",
                v
            )));
        }
        checked_integral(v, i64::MIN as f64, i64::MAX as f64, "int64").map(|v| v as i64)
    }
}

/// Accept `v` for an integer buffer only if it is a whole number in `[min, max]`
fn checked_integral(v: f64, min: f64, max: f64, name: &str) -> Result<f64> {
    if !v.is_finite() {
        return Err(MlioError::ConversionError(format!(
            "{} cannot be stored as {}",
            v, name
        )));
    }
    if v < min || v > max {
        return Err(MlioError::ConversionError(format!(
            "{} does not fit in {}",
            v, name
        )));
    }
    if v.fract() != 0.0 {
        return Err(MlioError::ConversionError(format!(
            "{} is not an integer and cannot be stored as {}",
            v, name
        )));
    }
    Ok(v)
}

/// Storage for one field: shape `(length,) + field_shape`
#[derive(Debug, Clone, PartialEq)]
pub enum FieldBuffer {
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
}

impl FieldBuffer {
    fn zeros(dtype: DType, shape: &[usize]) -> Self {
        let shape = IxDyn(shape);
        match dtype {
            DType::F32 => FieldBuffer::F32(ArrayD::zeros(shape)),
            DType::F64 => FieldBuffer::F64(ArrayD::zeros(shape)),
            DType::I32 => FieldBuffer::I32(ArrayD::zeros(shape)),
            DType::I64 => FieldBuffer::I64(ArrayD::zeros(shape)),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            FieldBuffer::F32(_) => DType::F32,
            FieldBuffer::F64(_) => DType::F64,
            FieldBuffer::I32(_) => DType::I32,
            FieldBuffer::I64(_) => DType::I64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            FieldBuffer::F32(buf) => buf.shape(),
            FieldBuffer::F64(buf) => buf.shape(),
            FieldBuffer::I32(buf) => buf.shape(),
            FieldBuffer::I64(buf) => buf.shape(),
        }
    }

    fn write(&mut self, t: usize, field: &Field, shape: &FieldShape) -> Result<()> {
        match self {
            FieldBuffer::F32(buf) => write_row(buf.index_axis_mut(Axis(0), t), field, shape),
            FieldBuffer::F64(buf) => write_row(buf.index_axis_mut(Axis(0), t), field, shape),
            FieldBuffer::I32(buf) => write_row(buf.index_axis_mut(Axis(0), t), field, shape),
            FieldBuffer::I64(buf) => write_row(buf.index_axis_mut(Axis(0), t), field, shape),
        }
    }

    fn get(&self, t: usize, shape: &FieldShape) -> FieldValue<'_> {
        match (self, shape) {
            (FieldBuffer::F32(buf), FieldShape::Scalar) => {
                FieldValue::Scalar(Scalar::F32(scalar_at(buf, t)))
            }
            (FieldBuffer::F64(buf), FieldShape::Scalar) => {
                FieldValue::Scalar(Scalar::F64(scalar_at(buf, t)))
            }
            (FieldBuffer::I32(buf), FieldShape::Scalar) => {
                FieldValue::Scalar(Scalar::I32(scalar_at(buf, t)))
            }
            (FieldBuffer::I64(buf), FieldShape::Scalar) => {
                FieldValue::Scalar(Scalar::I64(scalar_at(buf, t)))
            }
            (FieldBuffer::F32(buf), FieldShape::Array(_)) => {
                FieldValue::F32(buf.index_axis(Axis(0), t))
            }
            (FieldBuffer::F64(buf), FieldShape::Array(_)) => {
                FieldValue::F64(buf.index_axis(Axis(0), t))
            }
            (FieldBuffer::I32(buf), FieldShape::Array(_)) => {
                FieldValue::I32(buf.index_axis(Axis(0), t))
            }
            (FieldBuffer::I64(buf), FieldShape::Array(_)) => {
                FieldValue::I64(buf.index_axis(Axis(0), t))
            }
        }
    }
}

fn scalar_at<A: Element>(buf: &ArrayD<A>, t: usize) -> A {
    buf.index_axis(Axis(0), t)
        .iter()
        .next()
        .copied()
        .unwrap_or_default()
}

/// Copy one field value into its row of a buffer
///
/// Scalar values fill the whole row, so a scalar written to an array field
/// is broadcast across it.
fn write_row<A: Element>(
    mut row: ArrayViewMutD<'_, A>,
    field: &Field,
    shape: &FieldShape,
) -> Result<()> {
    let dims = shape.dims();
    match field {
        Field::Array(values) if values.shape() == dims => {
            for (dst, &src) in row.iter_mut().zip(values.iter()) {
                *dst = A::from_f64(src)?;
            }
            Ok(())
        }
        Field::Array(values) if dims.is_empty() => {
            // Single-element arrays are accepted for scalar slots
            let value = field.to_scalar().map_err(|_| MlioError::ShapeMismatch {
                expected: Vec::new(),
                actual: values.shape().to_vec(),
            })?;
            row.fill(A::from_f64(value)?);
            Ok(())
        }
        Field::Array(values) => Err(MlioError::ShapeMismatch {
            expected: dims.to_vec(),
            actual: values.shape().to_vec(),
        }),
        _ => {
            row.fill(A::from_f64(field.to_scalar()?)?);
            Ok(())
        }
    }
}

/// A field value read back from a [`MemoryDataset`]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Scalar(Scalar),
    F32(ArrayViewD<'a, f32>),
    F64(ArrayViewD<'a, f64>),
    I32(ArrayViewD<'a, i32>),
    I64(ArrayViewD<'a, i64>),
}

impl FieldValue<'_> {
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            FieldValue::Scalar(scalar) => Some(*scalar),
            _ => None,
        }
    }

    /// Owned copy of the value, with array elements widened to `f64`
    pub fn to_field(&self) -> Field {
        match self {
            FieldValue::Scalar(scalar) => Field::from(*scalar),
            FieldValue::F32(view) => Field::Array(view.mapv(|v| v as f64)),
            FieldValue::F64(view) => Field::Array(view.to_owned()),
            FieldValue::I32(view) => Field::Array(view.mapv(|v| v as f64)),
            FieldValue::I64(view) => Field::Array(view.mapv(|v| v as f64)),
        }
    }
}

/// One example yielded by a [`MemoryDataset`] pass
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryItem<'a> {
    /// Single-field datasets yield the value itself
    Single(FieldValue<'a>),
    /// Multi-field datasets yield one value per field, in field order
    Fields(Vec<FieldValue<'a>>),
}

impl MemoryItem<'_> {
    pub fn to_example(&self) -> Example {
        match self {
            MemoryItem::Single(value) => Example::Single(value.to_field()),
            MemoryItem::Fields(values) => {
                Example::Fields(values.iter().map(FieldValue::to_field).collect())
            }
        }
    }
}

/// Dataset held in fixed-shape typed buffers, one per field
#[derive(Debug, Clone)]
pub struct MemoryDataset {
    field_shapes: Vec<FieldShape>,
    buffers: Vec<FieldBuffer>,
    length: usize,
}

impl MemoryDataset {
    /// Materialize `source` into memory
    ///
    /// `field_shapes` and `dtypes` give the shape and element type of each
    /// field. When `length` is `None` the source is traversed once just to
    /// count its examples, then a second time to copy them.
    pub fn new<S>(
        source: S,
        field_shapes: Vec<FieldShape>,
        dtypes: Vec<DType>,
        length: Option<usize>,
    ) -> Result<Self>
    where
        S: IntoIterator + Clone,
        S::Item: IntoExample,
    {
        if field_shapes.is_empty() {
            return Err(MlioError::InvalidParameter(
                "At least one field shape is required".to_string(),
            ));
        }
        if field_shapes.len() != dtypes.len() {
            return Err(MlioError::InvalidParameter(format!(
                "Got {} field shapes but {} dtypes",
                field_shapes.len(),
                dtypes.len()
            )));
        }

        let length = match length {
            Some(length) => length,
            None => source.clone().into_iter().count(),
        };

        let mut buffers: Vec<FieldBuffer> = field_shapes
            .iter()
            .zip(dtypes.iter())
            .map(|(shape, &dtype)| {
                let mut mem_shape = vec![length];
                mem_shape.extend_from_slice(shape.dims());
                FieldBuffer::zeros(dtype, &mem_shape)
            })
            .collect();
        debug!(
            "materializing {} examples into {} field buffers",
            length,
            buffers.len()
        );

        let n_fields = field_shapes.len();
        let mut filled = 0;
        for (t, item) in source.into_iter().enumerate() {
            let example = item.into_example()?;
            if t >= length {
                return Err(MlioError::IndexOutOfRange {
                    index: t,
                    size: length,
                });
            }

            match example {
                Example::Single(field) if n_fields == 1 => {
                    buffers[0].write(t, &field, &field_shapes[0])?;
                }
                Example::Fields(fields) if fields.len() == n_fields => {
                    for (i, field) in fields.iter().enumerate() {
                        buffers[i].write(t, field, &field_shapes[i])?;
                    }
                }
                other => {
                    return Err(MlioError::ShapeMismatch {
                        expected: vec![n_fields],
                        actual: vec![other.n_fields()],
                    });
                }
            }
            filled += 1;
        }

        if filled < length {
            warn!(
                "source produced {} examples for a length of {}; remaining rows stay zero",
                filled, length
            );
        }

        Ok(Self {
            field_shapes,
            buffers,
            length,
        })
    }

    /// Number of examples held
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn n_fields(&self) -> usize {
        self.buffers.len()
    }

    pub fn field_shapes(&self) -> &[FieldShape] {
        &self.field_shapes
    }

    /// Buffer backing field `i`
    pub fn buffer(&self, i: usize) -> Option<&FieldBuffer> {
        self.buffers.get(i)
    }

    /// Example `t`, or `None` past the end
    pub fn get(&self, t: usize) -> Option<MemoryItem<'_>> {
        if t >= self.length {
            return None;
        }
        let mut values: Vec<FieldValue<'_>> = self
            .buffers
            .iter()
            .zip(self.field_shapes.iter())
            .map(|(buffer, shape)| buffer.get(t, shape))
            .collect();

        if values.len() == 1 {
            values.pop().map(MemoryItem::Single)
        } else {
            Some(MemoryItem::Fields(values))
        }
    }

    /// Start a new pass from the first example
    pub fn iter(&self) -> MemoryIter<'_> {
        MemoryIter {
            dataset: self,
            t: 0,
        }
    }
}

impl<'a> IntoIterator for &'a MemoryDataset {
    type Item = MemoryItem<'a>;
    type IntoIter = MemoryIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a [`MemoryDataset`]
#[derive(Debug, Clone)]
pub struct MemoryIter<'a> {
    dataset: &'a MemoryDataset,
    t: usize,
}

impl<'a> Iterator for MemoryIter<'a> {
    type Item = MemoryItem<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.dataset.get(self.t)?;
        self.t += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.dataset.len().saturating_sub(self.t);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MemoryIter<'_> {}
