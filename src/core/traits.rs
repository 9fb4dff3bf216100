//! Core traits for dataset consumption

use crate::core::{Example, Field, Result};
use ndarray::{Array1, ArrayD};

/// Conversion of a source item into an [`Example`]
///
/// Items produced lazily (for instance by a file-backed dataset) may carry
/// an error; converting such an item surfaces that error.
pub trait IntoExample {
    fn into_example(self) -> Result<Example>;
}

impl IntoExample for Example {
    fn into_example(self) -> Result<Example> {
        Ok(self)
    }
}

impl IntoExample for Field {
    fn into_example(self) -> Result<Example> {
        Ok(Example::Single(self))
    }
}

impl IntoExample for Vec<Field> {
    fn into_example(self) -> Result<Example> {
        Ok(Example::Fields(self))
    }
}

impl IntoExample for f64 {
    fn into_example(self) -> Result<Example> {
        Ok(Example::Single(Field::Float(self)))
    }
}

impl IntoExample for Array1<f64> {
    fn into_example(self) -> Result<Example> {
        Ok(Example::Single(Field::from(self)))
    }
}

impl IntoExample for ArrayD<f64> {
    fn into_example(self) -> Result<Example> {
        Ok(Example::Single(Field::Array(self)))
    }
}

impl<T: IntoExample> IntoExample for Result<T> {
    fn into_example(self) -> Result<Example> {
        self?.into_example()
    }
}

impl<T: IntoExample + Clone> IntoExample for &T {
    fn into_example(self) -> Result<Example> {
        self.clone().into_example()
    }
}
