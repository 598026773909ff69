//! Progress and per-entry messages on stderr.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{OwoColorize, Stream::Stderr};

use crate::pipeline::{Disposition, EntryReport, Summary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Nothing at all; for library callers and tests.
    Silent,
    /// Failed lookups only.
    Quiet,
    Normal,
}

pub struct Reporter {
    bar: ProgressBar,
    verbosity: Verbosity,
}

impl Reporter {
    pub fn new(verbosity: Verbosity) -> Self {
        let bar = match verbosity {
            Verbosity::Normal => {
                let style = ProgressStyle::with_template(
                    "{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ");
                ProgressBar::new(0).with_style(style)
            }
            Verbosity::Quiet | Verbosity::Silent => ProgressBar::hidden(),
        };
        Self { bar, verbosity }
    }

    pub fn silent() -> Self {
        Self::new(Verbosity::Silent)
    }

    pub fn begin(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    pub fn start(&self, key: &str) {
        self.bar.set_message(key.to_string());
    }

    pub fn entry(&self, report: &EntryReport) {
        let show = match self.verbosity {
            Verbosity::Silent => false,
            Verbosity::Quiet => matches!(report.disposition, Disposition::Failed(_)),
            Verbosity::Normal => true,
        };
        if show {
            let line = entry_line(report);
            self.bar.suspend(|| eprintln!("{line}"));
        }
        self.bar.inc(1);
    }

    pub fn finish(&self, summary: &Summary, output: &Path) {
        self.bar.finish_and_clear();
        if self.verbosity != Verbosity::Normal {
            return;
        }
        eprintln!("{}", summary_line(summary));
        if !summary.missing.is_empty() {
            eprintln!("Entries still without a DOI:");
            for name in &summary.missing {
                eprintln!("  {} {name}", "?".if_supports_color(Stderr, |t| t.yellow()));
            }
        }
        eprintln!("Wrote {}", output.display());
    }
}

pub fn entry_line(report: &EntryReport) -> String {
    let key = &report.key;
    match &report.disposition {
        Disposition::Enriched => format!(
            "{} {key}: added {}",
            "✓".if_supports_color(Stderr, |t| t.green()),
            describe_added(&report.added)
        ),
        Disposition::NoDoi if report.added.is_empty() => format!(
            "{} {key}: no DOI on record",
            "·".if_supports_color(Stderr, |t| t.yellow())
        ),
        Disposition::NoDoi => format!(
            "{} {key}: no DOI on record, added {}",
            "·".if_supports_color(Stderr, |t| t.yellow()),
            describe_added(&report.added)
        ),
        Disposition::HadDoi => format!(
            "{} {key}: already has a DOI",
            "=".if_supports_color(Stderr, |t| t.dimmed())
        ),
        Disposition::Skipped => format!(
            "{} {key}: no Semantic Scholar corpus id, skipped",
            "–".if_supports_color(Stderr, |t| t.dimmed())
        ),
        Disposition::Failed(err) => {
            let id = report
                .id
                .map(|id| format!(" of CorpusId:{id}"))
                .unwrap_or_default();
            let hint = if err.is_quota() {
                "; pass --api-key or set SEMANTIC_SCHOLAR_API_KEY for a higher quota"
            } else {
                ""
            };
            format!(
                "{} {key}: lookup{id} failed: {err}{hint}",
                "✗".if_supports_color(Stderr, |t| t.red())
            )
        }
    }
}

pub fn summary_line(summary: &Summary) -> String {
    format!(
        "{} {} enriched  {} {} failed  {} {} skipped  {} {} without DOI  {} {} already had one",
        "✓".if_supports_color(Stderr, |t| t.green()),
        summary.enriched,
        "✗".if_supports_color(Stderr, |t| t.red()),
        summary.failed,
        "–".if_supports_color(Stderr, |t| t.dimmed()),
        summary.skipped,
        "·".if_supports_color(Stderr, |t| t.yellow()),
        summary.no_doi,
        "=".if_supports_color(Stderr, |t| t.dimmed()),
        summary.had_doi,
    )
}

fn describe_added(added: &[(String, String)]) -> String {
    added
        .iter()
        .map(|(name, value)| format!("{name} {value}"))
        .collect::<Vec<_>>()
        .join(", ")
}
