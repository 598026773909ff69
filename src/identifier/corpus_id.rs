use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{bibtex::Entry, identifier::Identifier};

/// The field Semantic Scholar's BibTeX export puts the corpus link in.
pub const DEFAULT_FIELD: &str = "url";

/// Semantic Scholar's numeric paper id, as in `https://api.semanticscholar.org/CorpusID:13756489`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorpusId(u64);

impl CorpusId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Read the id out of `field` of `entry`.
    ///
    /// An absent, empty or unrecognisable field yields `None`; such entries are skipped.
    pub fn extract(entry: &Entry, field: &str) -> Option<Self> {
        let value = entry.get(field)?.text();
        let id = <CorpusId as Identifier<'_>>::parse(value);
        if id.is_none() && !value.trim().is_empty() {
            tracing::debug!(key = entry.key(), field, value, "no corpus id in field");
        }
        id
    }
}

impl<'a> Identifier<'a> for CorpusId {
    fn parse(identifier: &'a str) -> Option<Self> {
        static CORPUS_ID_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"(?i)\bcorpus_?id:\s*(\d+)\b").unwrap());

        let s = identifier.trim();
        let digits = if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            s
        } else {
            CORPUS_ID_RE.captures(s)?.get(1)?.as_str()
        };
        digits.parse().ok().map(CorpusId)
    }
}

impl fmt::Display for CorpusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bibtex::Bibliography;

    fn entry(src: &str) -> Entry {
        Bibliography::parse(src).unwrap().entries().next().unwrap().clone()
    }

    #[test]
    fn extracts_from_semantic_scholar_url() {
        let e = entry("@article{k,\n url = {https://api.semanticscholar.org/CorpusID:12345678}\n}");
        assert_eq!(CorpusId::extract(&e, DEFAULT_FIELD), Some(CorpusId::new(12345678)));
    }

    #[test]
    fn accepts_bare_digits_and_case_variants() {
        assert_eq!(CorpusId::parse(" 99999999 "), Some(CorpusId::new(99999999)));
        assert_eq!(CorpusId::parse("corpusid:42"), Some(CorpusId::new(42)));
        assert_eq!(CorpusId::parse("CorpusId: 42"), Some(CorpusId::new(42)));
        assert_eq!(CorpusId::parse("corpus_id:7"), Some(CorpusId::new(7)));
    }

    #[test]
    fn missing_empty_or_malformed_fields_yield_none() {
        let e = entry("@article{k, title = {T}}");
        assert_eq!(CorpusId::extract(&e, DEFAULT_FIELD), None);
        let e = entry("@article{k, url = {}}");
        assert_eq!(CorpusId::extract(&e, DEFAULT_FIELD), None);
        let e = entry("@article{k, url = {https://arxiv.org/abs/1706.03762}}");
        assert_eq!(CorpusId::extract(&e, DEFAULT_FIELD), None);
        let e = entry("@article{k, url = {https://api.semanticscholar.org/CorpusID:abc}}");
        assert_eq!(CorpusId::extract(&e, DEFAULT_FIELD), None);
    }

    #[test]
    fn field_name_is_configurable() {
        let e = entry("@article{k, corpusid = {1234}, url = {https://example.org}}");
        assert_eq!(CorpusId::extract(&e, "corpusid"), Some(CorpusId::new(1234)));
        assert_eq!(CorpusId::extract(&e, DEFAULT_FIELD), None);
    }

    #[test]
    fn any_id_survives_the_export_url() {
        proptest::proptest!(|(id in proptest::num::u64::ANY)| {
            let url = format!("https://api.semanticscholar.org/CorpusID:{id}");
            proptest::prop_assert_eq!(CorpusId::parse(&url), Some(CorpusId::new(id)));
        })
    }
}
