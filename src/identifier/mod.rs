//! Identifiers found in, or written into, bibliography entries.

pub mod corpus_id;
pub mod doi;

pub use corpus_id::CorpusId;
pub use doi::Doi;

pub trait Identifier<'a>: Sized + 'a {
    /// Recognise an identifier in free text, or return `None` if it isn't one.
    fn parse(identifier: &'a str) -> Option<Self>;
}
