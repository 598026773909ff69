use thiserror::Error;

/// The input could not be read as a BibTeX bibliography.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("entry #{entry} (line {line}, column {column}): {reason}")]
    Malformed {
        /// 1-based index of the entry being parsed.
        entry: usize,
        line: usize,
        column: usize,
        reason: Reason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Reason {
    #[error("missing citation key")]
    MissingKey,
    #[error("expected {expected}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
    },
    #[error("unterminated {0}")]
    Unterminated(&'static str),
}
