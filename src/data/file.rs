//! Lazy file-backed datasets
//!
//! A [`FileDataset`] never keeps the file open between passes: each call to
//! [`FileDataset::iter`] opens the file again and converts one line at a
//! time, so datasets larger than memory can be streamed repeatedly.

use crate::core::{MlioError, Result};
use crate::utils;
use log::debug;
use ndarray::Array1;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// Dataset that converts each line of a text file into an example on demand
#[derive(Clone)]
pub struct FileDataset<F> {
    path: PathBuf,
    load_line: F,
}

impl<F> fmt::Debug for FileDataset<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDataset")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl<F, E> FileDataset<F>
where
    F: Fn(&str) -> Result<E>,
{
    /// Create a dataset over `path`; nothing is opened until iteration
    pub fn new<P: AsRef<Path>>(path: P, load_line: F) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            load_line,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a new pass from the beginning of the file
    pub fn iter(&self) -> FileIter<'_, F> {
        FileIter {
            path: &self.path,
            load_line: &self.load_line,
            state: PassState::Pending,
            line: 0,
        }
    }
}

impl<'a, F, E> IntoIterator for &'a FileDataset<F>
where
    F: Fn(&str) -> Result<E>,
{
    type Item = Result<E>;
    type IntoIter = FileIter<'a, F>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

enum PassState {
    Pending,
    Open(Lines<BufReader<File>>),
    Done,
}

/// One pass over a [`FileDataset`]
///
/// The file is opened on the first call to `next` and closed when the pass
/// ends, fails, or the iterator is dropped. The first error ends the pass.
pub struct FileIter<'a, F> {
    path: &'a Path,
    load_line: &'a F,
    state: PassState,
    line: usize,
}

impl<'a, F> FileIter<'a, F> {
    fn fail(&mut self, err: MlioError) -> MlioError {
        self.state = PassState::Done;
        err
    }
}

impl<'a, F, E> Iterator for FileIter<'a, F>
where
    F: Fn(&str) -> Result<E>,
{
    type Item = Result<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if let PassState::Pending = self.state {
            match utils::open_text(self.path) {
                Ok(reader) => {
                    debug!("opened {} for a new pass", self.path.display());
                    self.state = PassState::Open(reader.lines());
                }
                Err(e) => return Some(Err(self.fail(e))),
            }
        }

        let lines = match &mut self.state {
            PassState::Open(lines) => lines,
            _ => return None,
        };

        match lines.next() {
            Some(Ok(text)) => {
                self.line += 1;
                match (self.load_line)(&text) {
                    Ok(example) => Some(Ok(example)),
                    Err(e) => {
                        let line = self.line;
                        Some(Err(self.fail(e.at_line(line))))
                    }
                }
            }
            Some(Err(e)) => {
                let line = self.line + 1;
                Some(Err(self.fail(MlioError::IoError(e).at_line(line))))
            }
            None => {
                debug!("finished pass over {} ({} lines)", self.path.display(), self.line);
                self.state = PassState::Done;
                None
            }
        }
    }
}

/// Parse a line of whitespace-separated numbers into a vector
pub fn load_line_default(line: &str) -> Result<Array1<f64>> {
    line.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| MlioError::ParseError(format!("Invalid number: {}", token)))
        })
        .collect::<Result<Vec<f64>>>()
        .map(Array1::from)
}

/// Stream a dataset from `path` without loading it in memory
pub fn load_from_file<P, F, E>(path: P, load_line: F) -> FileDataset<F>
where
    P: AsRef<Path>,
    F: Fn(&str) -> Result<E>,
{
    FileDataset::new(path, load_line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn matrix_file() -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "1 2 3").expect("Failed to write");
        writeln!(temp_file, "4.5 5 -6").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");
        temp_file
    }

    #[test]
    fn test_load_line_default() {
        assert_eq!(load_line_default("1 2.5  -3\n").unwrap(), array![1.0, 2.5, -3.0]);
        assert!(load_line_default("").unwrap().is_empty());
        assert!(matches!(
            load_line_default("1 x"),
            Err(MlioError::ParseError(_))
        ));
    }

    #[test]
    fn test_lines_in_file_order() {
        let temp_file = matrix_file();
        let dataset = load_from_file(temp_file.path(), load_line_default);

        let rows: Vec<_> = dataset.iter().collect::<Result<_>>().unwrap();
        assert_eq!(rows, vec![array![1.0, 2.0, 3.0], array![4.5, 5.0, -6.0]]);
    }

    #[test]
    fn test_independent_passes() {
        let temp_file = matrix_file();
        let dataset = FileDataset::new(temp_file.path(), load_line_default);

        let first: Vec<_> = dataset.iter().collect::<Result<_>>().unwrap();
        let second: Vec<_> = (&dataset).into_iter().collect::<Result<_>>().unwrap();
        assert_eq!(first, second);

        // Two passes in flight at once each hold their own handle
        let mut a = dataset.iter();
        let mut b = dataset.iter();
        assert_eq!(a.next().unwrap().unwrap(), array![1.0, 2.0, 3.0]);
        assert_eq!(b.next().unwrap().unwrap(), array![1.0, 2.0, 3.0]);
        assert_eq!(a.next().unwrap().unwrap(), array![4.5, 5.0, -6.0]);
        assert!(a.next().is_none());
    }

    #[test]
    fn test_abandoned_pass() {
        let temp_file = matrix_file();
        let dataset = FileDataset::new(temp_file.path(), load_line_default);

        let first = dataset.iter().next().unwrap().unwrap();
        assert_eq!(first, array![1.0, 2.0, 3.0]);
        assert_eq!(dataset.iter().count(), 2);
    }

    #[test]
    fn test_missing_file() {
        let dataset = FileDataset::new("/non/existent/file.txt", load_line_default);
        let mut iter = dataset.iter();

        assert!(matches!(iter.next(), Some(Err(MlioError::IoError(_)))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_conversion_error_aborts_pass() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "1 2").expect("Failed to write");
        writeln!(temp_file, "3 oops").expect("Failed to write");
        writeln!(temp_file, "5 6").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let dataset = FileDataset::new(temp_file.path(), load_line_default);
        let results: Vec<_> = dataset.iter().collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        match &results[1] {
            Err(MlioError::Line { line, source }) => {
                assert_eq!(*line, 2);
                assert!(matches!(**source, MlioError::ParseError(_)));
            }
            other => panic!("expected a line error, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_line_converter() {
        let temp_file = matrix_file();
        let dataset = FileDataset::new(temp_file.path(), |line: &str| {
            Ok(line.split_whitespace().count())
        });

        let widths: Vec<usize> = dataset.iter().collect::<Result<_>>().unwrap();
        assert_eq!(widths, vec![3, 3]);
        assert_eq!(dataset.path(), temp_file.path());
    }
}
