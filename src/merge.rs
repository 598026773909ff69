//! Folding lookup results back into entries.

use crate::{
    bibtex::Entry,
    resolver::{LookupFailure, MetadataResult},
};

pub const DOI_FIELD: &str = "doi";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergePolicy {
    /// When a paper has no DOI, record its arXiv id (as `eprint`) or DBLP key instead.
    pub fallback_ids: bool,
}

/// What happened when an entry was looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The entry carries no corpus id.
    Skipped,
    /// The entry already has a DOI, so nobody asked.
    AlreadyHasDoi,
    Found(MetadataResult),
    Failed(LookupFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub entry: Entry,
    /// Fields that were added, in the order they were added.
    pub added: Vec<(String, String)>,
}

impl Merged {
    pub fn added_doi(&self) -> Option<&str> {
        self.added
            .iter()
            .find(|(name, _)| name == DOI_FIELD)
            .map(|(_, value)| value.as_str())
    }
}

/// Combine `entry` with the outcome of its lookup.
///
/// Existing fields are never touched: an entry that already has a DOI comes back unchanged
/// whatever the outcome says.
pub fn merge(entry: &Entry, outcome: &LookupOutcome, policy: MergePolicy) -> Merged {
    let mut merged = Merged {
        entry: entry.clone(),
        added: Vec::new(),
    };
    let LookupOutcome::Found(meta) = outcome else {
        return merged;
    };
    if entry.contains(DOI_FIELD) {
        return merged;
    }

    let mut add = |name: &str, value: &str| {
        if merged.entry.push_field(name, value) {
            merged.added.push((name.to_string(), value.to_string()));
        }
    };

    if let Some(doi) = meta.doi.as_deref() {
        add(DOI_FIELD, doi);
    } else if policy.fallback_ids {
        if let Some(arxiv) = meta.arxiv.as_deref() {
            if !entry.contains("eprint") {
                add("eprint", arxiv);
                add("archiveprefix", "arXiv");
            }
        } else if let Some(dblp) = meta.dblp.as_deref() {
            add("dblp", dblp);
        }
    }
    merged
}
