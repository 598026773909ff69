use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{bibtex::ParseError, output::OutputError};

/// Errors that end a run. Per-entry lookup problems are not among them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not a valid BibTeX file", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Output(#[from] OutputError),
}
