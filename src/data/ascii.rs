//! Ascii matrix format loading
//!
//! Each line holds whitespace-separated numbers; every line must have the
//! same number of columns. The last column can optionally be read as a
//! target, in which case rows are exposed as (input, target) fields.

use crate::core::{AsciiMetadata, MlioError, Result};
use crate::data::fields::FieldRows;
use crate::utils;
use log::debug;
use ndarray::Array2;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

type ConvertFn = Box<dyn Fn(&str) -> Result<f64>>;

/// Options for [`ascii_load`]
pub struct AsciiOptions {
    /// Treat the last column as the target
    pub last_column_is_target: bool,
    convert_input: ConvertFn,
    convert_target: ConvertFn,
}

impl AsciiOptions {
    pub fn new() -> Self {
        Self {
            last_column_is_target: false,
            convert_input: Box::new(parse_number),
            convert_target: Box::new(parse_number),
        }
    }

    pub fn with_target_column(mut self) -> Self {
        self.last_column_is_target = true;
        self
    }

    /// Convert input tokens with `convert` instead of a plain float parse
    pub fn with_input<F>(mut self, convert: F) -> Self
    where
        F: Fn(&str) -> Result<f64> + 'static,
    {
        self.convert_input = Box::new(convert);
        self
    }

    /// Convert target tokens with `convert` instead of a plain float parse
    pub fn with_target<F>(mut self, convert: F) -> Self
    where
        F: Fn(&str) -> Result<f64> + 'static,
    {
        self.convert_target = Box::new(convert);
        self
    }
}

impl Default for AsciiOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AsciiOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsciiOptions")
            .field("last_column_is_target", &self.last_column_is_target)
            .finish_non_exhaustive()
    }
}

/// Result of [`ascii_load`]
#[derive(Debug, Clone, PartialEq)]
pub enum AsciiData {
    /// Plain matrix, one row per line
    Matrix(Array2<f64>),
    /// Matrix whose last column is the target
    Fields(Array2<f64>),
}

impl AsciiData {
    /// The loaded matrix, target column included
    pub fn matrix(&self) -> &Array2<f64> {
        match self {
            AsciiData::Matrix(data) | AsciiData::Fields(data) => data,
        }
    }

    /// Rows split into `[input, target]` fields; `None` for a plain matrix
    pub fn field_rows(&self) -> Option<FieldRows<'_, f64>> {
        match self {
            AsciiData::Matrix(_) => None,
            AsciiData::Fields(data) => {
                let n = data.ncols();
                let split = n.saturating_sub(1);
                Some(FieldRows::new(data.view(), vec![(0, split), (split, n)]))
            }
        }
    }
}

/// Read an ascii file into a matrix
pub fn ascii_load<P: AsRef<Path>>(
    path: P,
    options: &AsciiOptions,
) -> Result<(AsciiData, AsciiMetadata)> {
    let path = path.as_ref();
    debug!("loading {} (ascii)", path.display());
    ascii_from_reader(utils::open_text(path)?, options)
}

/// Read ascii data from any buffered reader
pub fn ascii_from_reader<R: BufRead>(
    reader: R,
    options: &AsciiOptions,
) -> Result<(AsciiData, AsciiMetadata)> {
    let mut values = Vec::new();
    let mut n_cols: Option<usize> = None;
    let mut n_rows = 0;

    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| MlioError::IoError(e).at_line(i + 1))?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        match n_cols {
            None => n_cols = Some(tokens.len()),
            Some(expected) if expected != tokens.len() => {
                return Err(MlioError::ShapeMismatch {
                    expected: vec![expected],
                    actual: vec![tokens.len()],
                }
                .at_line(i + 1));
            }
            Some(_) => {}
        }

        let last = tokens.len() - 1;
        for (j, &token) in tokens.iter().enumerate() {
            let value = if options.last_column_is_target && j == last {
                (options.convert_target)(token)
            } else {
                (options.convert_input)(token)
            };
            values.push(value.map_err(|e| e.at_line(i + 1))?);
        }
        n_rows += 1;
    }

    let n_cols = n_cols.unwrap_or(0);
    let data = Array2::from_shape_vec((n_rows, n_cols), values)
        .map_err(|e| MlioError::InvalidParameter(e.to_string()))?;
    debug!("read {} rows of {} columns", n_rows, n_cols);

    if options.last_column_is_target {
        let input_size = n_cols.saturating_sub(1);
        Ok((AsciiData::Fields(data), AsciiMetadata { input_size }))
    } else {
        Ok((AsciiData::Matrix(data), AsciiMetadata { input_size: n_cols }))
    }
}

fn parse_number(token: &str) -> Result<f64> {
    token
        .parse::<f64>()
        .map_err(|_| MlioError::ParseError(format!("Invalid number: {}", token)))
}
