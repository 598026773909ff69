use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{bibtex, identifier::Identifier};

/// A DOI split into its registrant prefix and item suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Doi<'a> {
    prefix: &'a str,
    suffix: &'a str,
}

impl<'a> Identifier<'a> for Doi<'a> {
    fn parse(identifier: &'a str) -> Option<Self> {
        let mut s = identifier.trim();

        // Normalise common textual prefixes.
        if let Some(rest) = s
            .strip_prefix("doi:")
            .or_else(|| s.strip_prefix("DOI:"))
            .or_else(|| s.strip_prefix("urn:doi:"))
            .or_else(|| s.strip_prefix("URN:DOI:"))
        {
            s = rest.trim_start();
        }

        if let Some(rest) = s
            .strip_prefix("https://doi.org/")
            .or_else(|| s.strip_prefix("http://doi.org/"))
            .or_else(|| s.strip_prefix("https://dx.doi.org/"))
            .or_else(|| s.strip_prefix("http://dx.doi.org/"))
        {
            s = rest;
        }

        // Suffixes may legitimately end in punctuation, so unlike prose we trim nothing else.
        static DOI_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^(10\.\d{4,9}(?:\.\d+)*)/([^\s\p{C}]+)$").unwrap());

        let caps = DOI_RE.captures(s)?;
        // Written out as a braced BibTeX value later, so braces must nest.
        if !bibtex::braces_balanced(s) {
            return None;
        }
        Some(Doi {
            prefix: caps.get(1)?.as_str(),
            suffix: caps.get(2)?.as_str(),
        })
    }
}

impl Doi<'_> {
    pub fn prefix(&self) -> &str {
        self.prefix
    }

    pub fn suffix(&self) -> &str {
        self.suffix
    }
}

impl fmt::Display for Doi<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.prefix, self.suffix)
    }
}

/// Bring a DOI reported by a metadata service into bare `10.x/y` form.
pub fn normalize(raw: &str) -> Option<String> {
    Doi::parse(raw).map(|d| d.to_string())
}
