//! LibSVM Load and Materialize Demonstration
//!
//! Writes a small libsvm file, loads it in sparse and dense mode, then copies
//! the dense examples into typed in-memory buffers (float32 inputs, int64
//! targets) and replays them.

use mlio::{DType, FieldShape, FieldValue, LibSvmLoader, MemoryDataset, MemoryItem, MlioError};
use std::io::Write;
use tempfile::NamedTempFile;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== LibSVM Load and Materialize ===");
    println!();

    let mut file = NamedTempFile::new()?;
    writeln!(file, "1 1:0.5 3:2.0")?;
    writeln!(file, "0 2:1.0")?;
    writeln!(file, "1 4:-1.5 1:0.25")?;
    file.flush()?;

    let loader = LibSvmLoader::new().with_target(|target: &str| {
        target
            .parse::<i64>()
            .map_err(|_| MlioError::ParseError(format!("Invalid label: {}", target)))
    });

    println!("Sparse load:");
    let (sparse, metadata) = loader.load_sparse(file.path())?;
    for example in &sparse {
        println!(
            "  target {:>2}  indices {:?}  values {:?}  extras {:?}",
            example.target, example.input.indices, example.input.values, example.extras
        );
    }
    println!("  input size: {}", metadata.input_size);
    println!("  targets:    {:?}", metadata.targets);
    println!();

    println!("Dense load and materialize:");
    let (dense, metadata) = loader.load_dense(file.path())?;
    let dataset = MemoryDataset::new(
        &dense,
        vec![FieldShape::array(&[metadata.input_size]), FieldShape::Scalar],
        vec![DType::F32, DType::I64],
        Some(dense.len()),
    )?;

    for item in dataset.iter() {
        if let MemoryItem::Fields(values) = item {
            match (&values[0], values[1].as_scalar()) {
                (FieldValue::F32(input), Some(target)) => {
                    println!("  input {}  target {}", input, target.as_f64())
                }
                other => println!("  unexpected item {:?}", other),
            }
        }
    }
    println!("  {} examples materialized", dataset.len());

    Ok(())
}
