//! Field-sliced iteration over the rows of a matrix
//!
//! Each row of a 2-D buffer is carved into contiguous column ranges
//! ("fields") without copying: every yielded slice is a view into the
//! borrowed matrix.

use crate::core::{Example, Field, IntoExample, MlioError, Result};
use ndarray::{s, ArrayView1, ArrayView2, Axis};

/// Re-iterable view over matrix rows split into `[begin, end)` column fields
#[derive(Debug, Clone)]
pub struct FieldRows<'a, A> {
    data: ArrayView2<'a, A>,
    fields: Vec<(usize, usize)>,
}

impl<'a, A> FieldRows<'a, A> {
    /// Create a field iterator over `data`
    ///
    /// Field ranges are not validated here; a range past the column extent
    /// is reported when the rows are iterated.
    pub fn new(data: ArrayView2<'a, A>, fields: Vec<(usize, usize)>) -> Self {
        Self { data, fields }
    }

    /// Field descriptors in yield order
    pub fn fields(&self) -> &[(usize, usize)] {
        &self.fields
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start a new pass from the first row
    pub fn iter(&self) -> FieldRowsIter<'a, '_, A> {
        FieldRowsIter {
            data: self.data.clone(),
            fields: &self.fields,
            row: 0,
        }
    }
}

impl<'a, 'f, A> IntoIterator for &'f FieldRows<'a, A> {
    type Item = Result<Vec<ArrayView1<'a, A>>>;
    type IntoIter = FieldRowsIter<'a, 'f, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a [`FieldRows`]
#[derive(Debug, Clone)]
pub struct FieldRowsIter<'a, 'f, A> {
    data: ArrayView2<'a, A>,
    fields: &'f [(usize, usize)],
    row: usize,
}

impl<'a, 'f, A> Iterator for FieldRowsIter<'a, 'f, A> {
    type Item = Result<Vec<ArrayView1<'a, A>>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.row >= self.data.nrows() {
            return None;
        }
        let row = self.data.clone().index_axis_move(Axis(0), self.row);
        self.row += 1;

        let ncols = row.len();
        let slices = self
            .fields
            .iter()
            .map(|&(begin, end)| {
                if begin > end {
                    return Err(MlioError::InvalidParameter(format!(
                        "Field range ({}, {}) is reversed",
                        begin, end
                    )));
                }
                if end > ncols {
                    return Err(MlioError::IndexOutOfRange {
                        index: end,
                        size: ncols,
                    });
                }
                Ok(row.clone().slice_move(s![begin..end]))
            })
            .collect();
        Some(slices)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.data.nrows().saturating_sub(self.row);
        (remaining, Some(remaining))
    }
}

impl IntoExample for Vec<ArrayView1<'_, f64>> {
    fn into_example(self) -> Result<Example> {
        Ok(Example::Fields(
            self.into_iter().map(|view| Field::from(view.to_owned())).collect(),
        ))
    }
}
