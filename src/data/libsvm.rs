//! LibSVM format loading
//!
//! Each line of a libsvm file reads:
//! label index:value index:value ...
//!
//! Example:
//! +1 1:0.5 3:1.2 7:0.8
//! -1 2:0.3 5:2.1 color:red
//!
//! Indices are 1-based. Features with an index below 1 are dropped, and
//! features whose id is not an integer are handed to a conversion callback
//! and appended to the example as extra fields.

use crate::core::{
    Example, Field, IntoExample, LibSvmMetadata, MlioError, Result, SparseVector,
};
use crate::utils;
use log::debug;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

/// One parsed libsvm line: an input representation, a target and any
/// extra (non-numeric id) features in encounter order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibSvmExample<I, T, X> {
    pub input: I,
    pub target: T,
    pub extras: Vec<X>,
}

pub type SparseExample<T = String, X = f64> = LibSvmExample<SparseVector, T, X>;
pub type DenseExample<T = String, X = f64> = LibSvmExample<Array1<f64>, T, X>;

/// Input of a line parsed with a runtime-chosen [`Representation`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Input {
    Sparse(SparseVector),
    Dense(Array1<f64>),
}

/// How a single line is turned into an input vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// Parallel (values, indices) lists
    Sparse,
    /// Zero-filled vector of `input_size` entries
    Dense { input_size: usize },
}

/// Output mode of a whole-file load
///
/// `Dense` always reads the file twice: once to size the feature space and
/// collect targets, once to fill the dense vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    #[default]
    Sparse,
    Dense,
}

/// Examples returned by [`LibSvmLoader::load`]
#[derive(Debug, Clone, PartialEq)]
pub enum LibSvmData<T, X> {
    Sparse(Vec<SparseExample<T, X>>),
    Dense(Vec<DenseExample<T, X>>),
}

impl<T, X> LibSvmData<T, X> {
    pub fn len(&self) -> usize {
        match self {
            LibSvmData::Sparse(examples) => examples.len(),
            LibSvmData::Dense(examples) => examples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_sparse(self) -> Option<Vec<SparseExample<T, X>>> {
        match self {
            LibSvmData::Sparse(examples) => Some(examples),
            LibSvmData::Dense(_) => None,
        }
    }

    pub fn into_dense(self) -> Option<Vec<DenseExample<T, X>>> {
        match self {
            LibSvmData::Dense(examples) => Some(examples),
            LibSvmData::Sparse(_) => None,
        }
    }
}

type TargetFn<T> = Box<dyn Fn(&str) -> Result<T>>;
type ExtraFn<X> = Box<dyn Fn(&str, &str) -> Result<X>>;

/// Line parser and file loader for the libsvm format
///
/// Conversion of targets and of non-numeric features is configured here
/// rather than through globals. The default loader keeps targets as strings
/// and parses extra feature values as floats.
pub struct LibSvmLoader<T = String, X = f64> {
    convert_target: TargetFn<T>,
    convert_extra: ExtraFn<X>,
    input_size: Option<usize>,
}

impl LibSvmLoader<String, f64> {
    /// Create a loader with string targets and float extra features
    pub fn new() -> Self {
        Self {
            convert_target: Box::new(|target: &str| Ok(target.to_string())),
            convert_extra: Box::new(|_: &str, value: &str| parse_value(value)),
            input_size: None,
        }
    }
}

impl Default for LibSvmLoader<String, f64> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, X> fmt::Debug for LibSvmLoader<T, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibSvmLoader")
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl<T, X> LibSvmLoader<T, X> {
    /// Fix the feature-space size instead of discovering it from the data
    pub fn with_input_size(mut self, input_size: usize) -> Self {
        self.input_size = Some(input_size);
        self
    }

    /// Convert the raw target token with `convert`
    pub fn with_target<U, F>(self, convert: F) -> LibSvmLoader<U, X>
    where
        F: Fn(&str) -> Result<U> + 'static,
    {
        LibSvmLoader {
            convert_target: Box::new(convert),
            convert_extra: self.convert_extra,
            input_size: self.input_size,
        }
    }

    /// Convert non-numeric features with `convert(id, value)`
    pub fn with_extra<Y, F>(self, convert: F) -> LibSvmLoader<T, Y>
    where
        F: Fn(&str, &str) -> Result<Y> + 'static,
    {
        LibSvmLoader {
            convert_target: self.convert_target,
            convert_extra: Box::new(convert),
            input_size: self.input_size,
        }
    }

    /// Caller-supplied feature-space size, if any
    pub fn input_size(&self) -> Option<usize> {
        self.input_size
    }

    /// Parse a line into the requested representation
    pub fn parse_line(
        &self,
        line: &str,
        repr: Representation,
    ) -> Result<LibSvmExample<Input, T, X>> {
        match repr {
            Representation::Sparse => {
                let example = self.parse_sparse_line(line)?;
                Ok(LibSvmExample {
                    input: Input::Sparse(example.input),
                    target: example.target,
                    extras: example.extras,
                })
            }
            Representation::Dense { input_size } => {
                let example = self.parse_dense_line(line, input_size)?;
                Ok(LibSvmExample {
                    input: Input::Dense(example.input),
                    target: example.target,
                    extras: example.extras,
                })
            }
        }
    }

    /// Parse a line into parallel (values, indices) lists, in token order
    pub fn parse_sparse_line(&self, line: &str) -> Result<SparseExample<T, X>> {
        let tokens = Tokens::split(line)?;

        let n_feat = tokens.features.len();
        let mut values = Vec::with_capacity(n_feat);
        let mut indices = Vec::with_capacity(n_feat);
        for &(index, value) in &tokens.features {
            indices.push(index);
            values.push(parse_value(value)?);
        }

        Ok(LibSvmExample {
            input: SparseVector { values, indices },
            target: (self.convert_target)(tokens.target)?,
            extras: self.convert_extras(&tokens)?,
        })
    }

    /// Parse a line into a dense vector of `input_size` entries
    ///
    /// Feature `i` is stored at position `i - 1`; an index beyond
    /// `input_size` is an [`MlioError::IndexOutOfRange`].
    pub fn parse_dense_line(&self, line: &str, input_size: usize) -> Result<DenseExample<T, X>> {
        let tokens = Tokens::split(line)?;

        let mut input = Array1::<f64>::zeros(input_size);
        for &(index, value) in &tokens.features {
            if index > input_size {
                return Err(MlioError::IndexOutOfRange {
                    index,
                    size: input_size,
                });
            }
            input[index - 1] = parse_value(value)?;
        }

        Ok(LibSvmExample {
            input,
            target: (self.convert_target)(tokens.target)?,
            extras: self.convert_extras(&tokens)?,
        })
    }

    fn convert_extras(&self, tokens: &Tokens<'_>) -> Result<Vec<X>> {
        tokens
            .extras
            .iter()
            .map(|&(id, value)| (self.convert_extra)(id, value))
            .collect()
    }
}

impl<T: Ord + Clone, X> LibSvmLoader<T, X> {
    /// Load a libsvm file in the given mode
    pub fn load<P: AsRef<Path>>(
        &self,
        path: P,
        mode: LoadMode,
    ) -> Result<(LibSvmData<T, X>, LibSvmMetadata<T>)> {
        match mode {
            LoadMode::Sparse => {
                let (examples, metadata) = self.load_sparse(path)?;
                Ok((LibSvmData::Sparse(examples), metadata))
            }
            LoadMode::Dense => {
                let (examples, metadata) = self.load_dense(path)?;
                Ok((LibSvmData::Dense(examples), metadata))
            }
        }
    }

    /// Load a libsvm file as sparse examples in a single pass
    pub fn load_sparse<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(Vec<SparseExample<T, X>>, LibSvmMetadata<T>)> {
        let path = path.as_ref();
        debug!("loading {} (sparse)", path.display());
        self.sparse_from_reader(utils::open_text(path)?)
    }

    /// Load a libsvm file as dense examples, reading it twice
    pub fn load_dense<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(Vec<DenseExample<T, X>>, LibSvmMetadata<T>)> {
        let path = path.as_ref();
        debug!("loading {} (dense)", path.display());
        self.dense_from_source(|| utils::open_text(path))
    }

    /// Parse sparse examples from any buffered reader
    pub fn sparse_from_reader<R: BufRead>(
        &self,
        reader: R,
    ) -> Result<(Vec<SparseExample<T, X>>, LibSvmMetadata<T>)> {
        self.scan(reader, true)
    }

    /// Parse dense examples from a source that `open` can produce twice
    ///
    /// The first reader sizes the feature space (unless an input size was
    /// supplied) and collects the targets; the second is parsed densely.
    pub fn dense_from_source<R, O>(
        &self,
        mut open: O,
    ) -> Result<(Vec<DenseExample<T, X>>, LibSvmMetadata<T>)>
    where
        R: BufRead,
        O: FnMut() -> Result<R>,
    {
        let (_, metadata) = self.scan(open()?, false)?;

        let mut examples = Vec::new();
        for (i, line) in open()?.lines().enumerate() {
            let line = line.map_err(|e| MlioError::IoError(e).at_line(i + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            let example = self
                .parse_dense_line(&line, metadata.input_size)
                .map_err(|e| e.at_line(i + 1))?;
            examples.push(example);
        }
        debug!("dense pass produced {} examples", examples.len());

        Ok((examples, metadata))
    }

    /// Sparse pass computing the metadata, optionally keeping the examples
    fn scan<R: BufRead>(
        &self,
        reader: R,
        retain: bool,
    ) -> Result<(Vec<SparseExample<T, X>>, LibSvmMetadata<T>)> {
        let mut examples = Vec::new();
        let mut targets = BTreeSet::new();
        let mut input_size = self.input_size.unwrap_or(0);
        let mut n_lines = 0;

        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| MlioError::IoError(e).at_line(i + 1))?;
            if line.trim().is_empty() {
                continue;
            }
            let example = self
                .parse_sparse_line(&line)
                .map_err(|e| e.at_line(i + 1))?;

            if self.input_size.is_none() {
                input_size = input_size.max(example.input.max_index());
            }
            targets.insert(example.target.clone());
            n_lines += 1;

            if retain {
                examples.push(example);
            }
        }

        debug!(
            "sizing pass read {} examples: input_size={}, {} distinct targets",
            n_lines,
            input_size,
            targets.len()
        );

        Ok((
            examples,
            LibSvmMetadata {
                targets,
                input_size,
            },
        ))
    }
}

/// Load a libsvm file with string targets and float extra features
pub fn libsvm_load<P: AsRef<Path>>(
    path: P,
    mode: LoadMode,
) -> Result<(LibSvmData<String, f64>, LibSvmMetadata<String>)> {
    LibSvmLoader::new().load(path, mode)
}

/// Tokens of one line, classified but not yet converted
struct Tokens<'l> {
    target: &'l str,
    /// (1-based index, raw value) for integer ids >= 1
    features: Vec<(usize, &'l str)>,
    /// (id, raw value) for non-integer ids
    extras: Vec<(&'l str, &'l str)>,
}

impl<'l> Tokens<'l> {
    fn split(line: &'l str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let target = parts
            .next()
            .ok_or_else(|| MlioError::ParseError("Empty line".to_string()))?;

        let mut features = Vec::new();
        let mut extras = Vec::new();
        for token in parts {
            let (id, value) = token.split_once(':').ok_or_else(|| {
                MlioError::ParseError(format!("Invalid feature format: {}", token))
            })?;

            if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
                let index = id.parse::<usize>().map_err(|_| {
                    MlioError::ParseError(format!("Invalid feature index: {}", id))
                })?;
                // Index 0 is reserved
                if index >= 1 {
                    features.push((index, value));
                }
            } else {
                extras.push((id, value));
            }
        }

        Ok(Self {
            target,
            features,
            extras,
        })
    }
}

fn parse_value(value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| MlioError::ParseError(format!("Invalid feature value: {}", value)))
}

impl<T, X> IntoExample for LibSvmExample<Array1<f64>, T, X>
where
    T: Into<Field>,
    X: Into<Field>,
{
    fn into_example(self) -> Result<Example> {
        let mut fields = Vec::with_capacity(2 + self.extras.len());
        fields.push(Field::from(self.input));
        fields.push(self.target.into());
        fields.extend(self.extras.into_iter().map(Into::into));
        Ok(Example::Fields(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Cursor;

    fn sample_text() -> &'static str {
        "+1 1:0.5 3:2.0\n-1 2:1.0\n"
    }

    #[test]
    fn test_parse_sparse_line_basic() {
        let loader = LibSvmLoader::new();
        let example = loader.parse_sparse_line("+1 1:0.5 3:1.2").unwrap();

        assert_eq!(example.target, "+1");
        assert_eq!(example.input.indices, vec![1, 3]);
        assert_eq!(example.input.values, vec![0.5, 1.2]);
        assert!(example.extras.is_empty());
    }

    #[test]
    fn test_parse_sparse_line_keeps_token_order() {
        let loader = LibSvmLoader::new();
        let example = loader.parse_sparse_line("  -1 7:0.8 2:0.3\n").unwrap();

        assert_eq!(example.target, "-1");
        assert_eq!(example.input.indices, vec![7, 2]);
        assert_eq!(example.input.values, vec![0.8, 0.3]);
    }

    #[test]
    fn test_parse_dense_line() {
        let loader = LibSvmLoader::new();
        let example = loader.parse_dense_line("+1 1:0.5 3:2.0", 4).unwrap();

        assert_eq!(example.input, array![0.5, 0.0, 2.0, 0.0]);
        assert_eq!(example.target, "+1");
    }

    #[test]
    fn test_reserved_indices_are_dropped() {
        let loader = LibSvmLoader::new();

        let sparse = loader.parse_sparse_line("+1 0:9.0 2:1.0 00:4.0").unwrap();
        assert_eq!(sparse.input.indices, vec![2]);
        assert_eq!(sparse.input.values, vec![1.0]);
        assert_eq!(sparse.input.nnz(), 1);

        let dense = loader.parse_dense_line("+1 0:9.0 2:1.0", 2).unwrap();
        assert_eq!(dense.input, array![0.0, 1.0]);
    }

    #[test]
    fn test_non_digit_features_become_extras() {
        let loader = LibSvmLoader::new()
            .with_extra(|id: &str, value: &str| Ok(format!("{}={}", id, value)));
        let example = loader.parse_sparse_line("+1 1:0.5 cat:yes -2:1 dog:no").unwrap();

        assert_eq!(example.input.nnz(), 1);
        assert_eq!(example.input.indices, vec![1]);
        assert_eq!(example.extras, vec!["cat=yes", "-2=1", "dog=no"]);
    }

    #[test]
    fn test_default_extra_conversion_parses_value() {
        let loader = LibSvmLoader::new();
        let example = loader.parse_sparse_line("+1 weight:2.5").unwrap();
        assert_eq!(example.extras, vec![2.5]);

        assert!(loader.parse_sparse_line("+1 cat:yes").is_err());
    }

    #[test]
    fn test_target_conversion() {
        let loader = LibSvmLoader::new().with_target(|target: &str| {
            target
                .parse::<i64>()
                .map_err(|_| MlioError::ParseError(format!("Invalid label: {}", target)))
        });

        assert_eq!(loader.parse_sparse_line("+1 1:1").unwrap().target, 1);
        assert_eq!(loader.parse_sparse_line("-3 1:1").unwrap().target, -3);
        assert!(loader.parse_sparse_line("x 1:1").is_err());
    }

    #[test]
    fn test_line_without_features() {
        let loader = LibSvmLoader::new();

        let sparse = loader.parse_sparse_line("+1").unwrap();
        assert!(sparse.input.is_empty());

        let dense = loader.parse_dense_line("+1", 3).unwrap();
        assert_eq!(dense.input, array![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_parse_line_malformed() {
        let loader = LibSvmLoader::new();

        // Missing colon
        assert!(matches!(
            loader.parse_sparse_line("+1 1"),
            Err(MlioError::ParseError(_))
        ));
        // Value that is not a number
        assert!(matches!(
            loader.parse_sparse_line("+1 1:abc"),
            Err(MlioError::ParseError(_))
        ));
        // Extra colon leaves a malformed value
        assert!(matches!(
            loader.parse_dense_line("+1 1:2:3", 3),
            Err(MlioError::ParseError(_))
        ));
        // No target
        assert!(matches!(
            loader.parse_sparse_line("   "),
            Err(MlioError::ParseError(_))
        ));
    }

    #[test]
    fn test_dense_index_out_of_range() {
        let loader = LibSvmLoader::new();
        let result = loader.parse_dense_line("+1 1:0.5 4:1.0", 3);

        assert!(matches!(
            result,
            Err(MlioError::IndexOutOfRange { index: 4, size: 3 })
        ));
    }

    #[test]
    fn test_sparse_matches_dense() {
        let loader = LibSvmLoader::new();
        let lines = [
            "+1 1:0.5 3:2.0",
            "-1 2:1.0",
            "+1 5:-1.5 1:3.0 0:7.0",
            "-1",
            "+1 4:1e-3 tag:1",
        ];

        for line in lines {
            let sparse = loader.parse_sparse_line(line).unwrap();
            let dense = loader.parse_dense_line(line, 6).unwrap();
            assert_eq!(sparse.input.to_dense(6).unwrap(), dense.input, "line {:?}", line);
            assert_eq!(sparse.target, dense.target);
            assert_eq!(sparse.extras, dense.extras);
        }
    }

    #[test]
    fn test_parse_line_representation() {
        let loader = LibSvmLoader::new();

        let sparse = loader.parse_line("+1 2:1.0", Representation::Sparse).unwrap();
        assert!(matches!(sparse.input, Input::Sparse(ref sv) if sv.indices == vec![2]));

        let dense = loader
            .parse_line("+1 2:1.0", Representation::Dense { input_size: 2 })
            .unwrap();
        assert_eq!(dense.input, Input::Dense(array![0.0, 1.0]));
    }

    #[test]
    fn test_sparse_from_reader() {
        let loader = LibSvmLoader::new();
        let (examples, metadata) = loader.sparse_from_reader(Cursor::new(sample_text())).unwrap();

        assert_eq!(examples.len(), 2);
        assert_eq!(metadata.input_size, 3);
        assert_eq!(
            metadata.targets,
            ["+1", "-1"]
                .iter()
                .map(|s| s.to_string())
                .collect::<BTreeSet<String>>()
        );
        assert_eq!(examples[0].input.values, vec![0.5, 2.0]);
        assert_eq!(examples[0].input.indices, vec![1, 3]);
        assert_eq!(examples[1].input.indices, vec![2]);
    }

    #[test]
    fn test_dense_from_source_reads_twice() {
        let loader = LibSvmLoader::new();
        let mut opened = 0;
        let (examples, metadata) = loader
            .dense_from_source(|| {
                opened += 1;
                Ok(Cursor::new(sample_text()))
            })
            .unwrap();

        assert_eq!(opened, 2);
        assert_eq!(metadata.input_size, 3);
        assert_eq!(examples[0].input, array![0.5, 0.0, 2.0]);
        assert_eq!(examples[1].input, array![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_supplied_input_size() {
        let loader = LibSvmLoader::new().with_input_size(5);
        let (examples, metadata) = loader
            .dense_from_source(|| Ok(Cursor::new(sample_text())))
            .unwrap();

        assert_eq!(metadata.input_size, 5);
        assert_eq!(examples[1].input, array![0.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_undersized_input_size_fails_on_offending_line() {
        let loader = LibSvmLoader::new().with_input_size(2);

        // Sparse loading does not write into a fixed-size vector
        let (_, metadata) = loader.sparse_from_reader(Cursor::new(sample_text())).unwrap();
        assert_eq!(metadata.input_size, 2);

        let err = loader
            .dense_from_source(|| Ok(Cursor::new(sample_text())))
            .unwrap_err();
        match err {
            MlioError::Line { line, source } => {
                assert_eq!(line, 1);
                assert!(matches!(*source, MlioError::IndexOutOfRange { index: 3, size: 2 }));
            }
            other => panic!("expected a line error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let loader = LibSvmLoader::new();
        let text = "\n+1 1:1.0\n   \n-1 4:2.0\n";
        let (examples, metadata) = loader.sparse_from_reader(Cursor::new(text)).unwrap();

        assert_eq!(examples.len(), 2);
        assert_eq!(metadata.input_size, 4);
    }

    #[test]
    fn test_error_reports_line_number() {
        let loader = LibSvmLoader::new();
        let text = "+1 1:1.0\n-1 2\n";
        let err = loader.sparse_from_reader(Cursor::new(text)).unwrap_err();

        assert!(matches!(err, MlioError::Line { line: 2, .. }));
        assert!(matches!(err.root(), MlioError::ParseError(_)));
    }

    #[test]
    fn test_empty_source() {
        let loader = LibSvmLoader::new();
        let (examples, metadata) = loader.sparse_from_reader(Cursor::new("")).unwrap();

        assert!(examples.is_empty());
        assert_eq!(metadata.input_size, 0);
        assert!(metadata.targets.is_empty());

        let sized = LibSvmLoader::new().with_input_size(8);
        let (_, metadata) = sized.sparse_from_reader(Cursor::new("")).unwrap();
        assert_eq!(metadata.input_size, 8);
    }

    #[test]
    fn test_dense_example_into_fields() {
        let loader = LibSvmLoader::new();
        let example = loader.parse_dense_line("+1 2:1.0 w:0.5", 2).unwrap();

        assert_eq!(
            example.into_example().unwrap(),
            Example::Fields(vec![
                Field::from(array![0.0, 1.0]),
                Field::from("+1"),
                Field::Float(0.5),
            ])
        );
    }

    #[test]
    fn test_data_accessors() {
        let data: LibSvmData<String, f64> = LibSvmData::Sparse(Vec::new());
        assert!(data.is_empty());
        assert!(data.clone().into_dense().is_none());
        assert_eq!(data.into_sparse().map(|v| v.len()), Some(0));
    }
}
