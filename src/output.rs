//! Choosing where results go and getting them there without leaving half-written files.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("refusing to overwrite the input file {}", .0.display())]
    SameAsInput(PathBuf),
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// `refs.bib` becomes `refs_modified.bib`, next to the input.
pub fn derive_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bibliography".to_string());
    input.with_file_name(format!("{stem}_modified.bib"))
}

pub fn ensure_distinct(input: &Path, output: &Path) -> Result<(), OutputError> {
    let same = match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };
    if same {
        return Err(OutputError::SameAsInput(output.to_path_buf()));
    }
    Ok(())
}

/// Write `contents` to `path` through a temporary file in the same directory, renamed into
/// place once fully written. Readers see the old file or the new one, never a prefix.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), OutputError> {
    let wrap = |source: io::Error| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".bibdoi-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(wrap)?;
    tmp.write_all(contents.as_bytes()).map_err(wrap)?;
    tmp.as_file().sync_all().map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote output");
    Ok(())
}
