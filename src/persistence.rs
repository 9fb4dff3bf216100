//! Object serialization and persistence
//!
//! Any `serde`-serializable value (loaded datasets, metadata, materialized
//! arrays) can be written to a file and read back. `gsave`/`gload` do the
//! same through a gzip layer.

use crate::core::{MlioError, Result};
use crate::utils;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Save a value to file
pub fn save<T: Serialize + ?Sized, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let file = File::create(utils::expand_home(path)).map_err(MlioError::IoError)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|e| MlioError::SerializationError(e.to_string()))?;
    writer.flush().map_err(MlioError::IoError)?;
    Ok(())
}

/// Load a value saved with [`save`]
pub fn load<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let file = File::open(utils::expand_home(path)).map_err(MlioError::IoError)?;
    let reader = BufReader::new(file);
    let value = serde_json::from_reader(reader)
        .map_err(|e| MlioError::SerializationError(e.to_string()))?;
    Ok(value)
}

/// Save a value to a gzip-compressed file
pub fn gsave<T: Serialize + ?Sized, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let file = File::create(utils::expand_home(path)).map_err(MlioError::IoError)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, value)
        .map_err(|e| MlioError::SerializationError(e.to_string()))?;
    encoder.finish()?.flush().map_err(MlioError::IoError)?;
    Ok(())
}

/// Load a value saved with [`gsave`]
pub fn gload<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let file = File::open(utils::expand_home(path)).map_err(MlioError::IoError)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let value = serde_json::from_reader(decoder)
        .map_err(|e| MlioError::SerializationError(e.to_string()))?;
    Ok(value)
}
