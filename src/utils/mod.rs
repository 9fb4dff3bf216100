//! Path and file helpers shared by the loaders

use crate::core::{MlioError, Result};
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Expand a leading `~` to the current user's home directory
///
/// Only `~` alone or `~/...` is expanded; `~user` forms and paths without a
/// leading tilde are returned unchanged, as is everything when no home
/// directory is set.
pub fn expand_home<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    let home = match env::var_os("HOME").or_else(|| env::var_os("USERPROFILE")) {
        Some(home) => PathBuf::from(home),
        None => return path.to_path_buf(),
    };

    match path.strip_prefix("~") {
        Ok(rest) if rest.as_os_str().is_empty() => home,
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Open a text source for buffered line reading, expanding `~` first
pub fn open_text<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
    let file = File::open(expand_home(path)).map_err(MlioError::IoError)?;
    Ok(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_expand_home() {
        let home = match env::var_os("HOME") {
            Some(home) => PathBuf::from(home),
            None => return,
        };

        assert_eq!(expand_home("~"), home);
        assert_eq!(expand_home("~/data/a.libsvm"), home.join("data/a.libsvm"));
        assert_eq!(expand_home("/tmp/a.libsvm"), PathBuf::from("/tmp/a.libsvm"));
        assert_eq!(expand_home("data/~/x"), PathBuf::from("data/~/x"));
        assert_eq!(expand_home("~user/x"), PathBuf::from("~user/x"));
    }

    #[test]
    fn test_open_text() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "1 2 3").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        assert!(open_text(temp_file.path()).is_ok());
        assert!(matches!(
            open_text("/non/existent/file.txt"),
            Err(MlioError::IoError(_))
        ));
    }
}
