//! The enrichment pass: parse, look every entry up in turn, merge, write.

use std::{fs, path::Path};

use crate::{
    bibtex::{Bibliography, Entry},
    error::Error,
    identifier::{CorpusId, corpus_id},
    merge::{self, DOI_FIELD, LookupOutcome, MergePolicy, Merged},
    output,
    report::Reporter,
    resolver::{LookupFailure, MetadataSource},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Field holding the corpus id.
    pub id_field: String,
    pub policy: MergePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_field: corpus_id::DEFAULT_FIELD.to_string(),
            policy: MergePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// A DOI was added.
    Enriched,
    /// The service knows the paper but has no DOI for it.
    NoDoi,
    HadDoi,
    Skipped,
    Failed(LookupFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub key: String,
    pub title: Option<String>,
    pub id: Option<CorpusId>,
    pub added: Vec<(String, String)>,
    pub disposition: Disposition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub enriched: usize,
    pub no_doi: usize,
    pub had_doi: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Titles (or keys) of looked-up entries that still have no DOI.
    pub missing: Vec<String>,
}

impl Summary {
    fn record(&mut self, report: &EntryReport) {
        match report.disposition {
            Disposition::Enriched => self.enriched += 1,
            Disposition::HadDoi => self.had_doi += 1,
            Disposition::Skipped => self.skipped += 1,
            Disposition::NoDoi => self.no_doi += 1,
            Disposition::Failed(_) => self.failed += 1,
        }
        if matches!(report.disposition, Disposition::NoDoi | Disposition::Failed(_)) {
            self.missing
                .push(report.title.clone().unwrap_or_else(|| report.key.clone()));
        }
    }

    pub fn total(&self) -> usize {
        self.enriched + self.no_doi + self.had_doi + self.skipped + self.failed
    }
}

pub struct Pipeline<S> {
    source: S,
    config: Config,
}

impl<S: MetadataSource> Pipeline<S> {
    pub fn new(source: S, config: Config) -> Self {
        Self { source, config }
    }

    /// Look one entry up and merge the result. A failed lookup is recorded, never raised.
    pub fn process(&self, entry: &Entry) -> (Merged, EntryReport) {
        let id = CorpusId::extract(entry, &self.config.id_field);
        let outcome = if entry.contains(DOI_FIELD) {
            LookupOutcome::AlreadyHasDoi
        } else if let Some(id) = id {
            match self.source.lookup(id) {
                Ok(meta) => LookupOutcome::Found(meta),
                Err(err) => {
                    tracing::warn!(key = entry.key(), %id, error = %err, "lookup failed");
                    LookupOutcome::Failed(err)
                }
            }
        } else {
            LookupOutcome::Skipped
        };

        let merged = merge::merge(entry, &outcome, self.config.policy);
        let disposition = match outcome {
            LookupOutcome::Skipped => Disposition::Skipped,
            LookupOutcome::AlreadyHasDoi => Disposition::HadDoi,
            LookupOutcome::Failed(err) => Disposition::Failed(err),
            LookupOutcome::Found(_) if merged.added_doi().is_some() => Disposition::Enriched,
            LookupOutcome::Found(_) => Disposition::NoDoi,
        };
        let report = EntryReport {
            key: entry.key().to_string(),
            title: entry.title(),
            id,
            added: merged.added.clone(),
            disposition,
        };
        (merged, report)
    }

    /// Run every entry of `bib` through [`Pipeline::process`], in order, updating it in place.
    pub fn enrich(&self, bib: &mut Bibliography, reporter: &Reporter) -> Summary {
        reporter.begin(bib.len());
        let mut summary = Summary::default();
        for entry in bib.entries_mut() {
            reporter.start(entry.key());
            let (merged, report) = self.process(entry);
            *entry = merged.entry;
            reporter.entry(&report);
            summary.record(&report);
        }
        tracing::info!(
            enriched = summary.enriched,
            failed = summary.failed,
            skipped = summary.skipped,
            "enrichment pass complete"
        );
        summary
    }

    /// Enrich the bibliography at `input` and write it to `output`.
    ///
    /// Nothing is written unless the input parses and every entry has been processed.
    pub fn run(&self, input: &Path, output: &Path, reporter: &Reporter) -> Result<Summary, Error> {
        tracing::info!(input = %input.display(), output = %output.display(), "starting");
        let src = fs::read_to_string(input).map_err(|source| Error::Read {
            path: input.to_path_buf(),
            source,
        })?;
        let mut bib = Bibliography::parse(&src).map_err(|source| Error::Parse {
            path: input.to_path_buf(),
            source,
        })?;
        output::ensure_distinct(input, output)?;

        let summary = self.enrich(&mut bib, reporter);
        output::write_atomic(output, &bib.to_bibtex_string())?;
        Ok(summary)
    }
}
