//! Add missing DOIs to BibTeX exported from Semantic Scholar.
//!
//! Each entry's corpus id is read from its `url` field, looked up against the Semantic
//! Scholar Graph API, and any DOI found is appended to the entry. Everything else in the
//! file is written back byte for byte.

pub mod bibtex;
pub mod error;
pub mod identifier;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod resolver;

pub use error::Error;
pub use pipeline::{Config, Pipeline, Summary};
pub use resolver::{ClientConfig, MetadataSource, SemanticScholar};
