use std::{path::PathBuf, time::Duration};

use bibdoi::{
    ClientConfig, Config, identifier::corpus_id, merge::MergePolicy, report::Verbosity,
    resolver::DEFAULT_BASE_URL,
};
use clap::{ArgAction, Parser};

/// Add missing DOIs to a BibTeX file exported from Semantic Scholar.
///
/// The enriched bibliography is written next to the input as `<name>_modified.bib`; the
/// input itself is never modified.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// BibTeX file to enrich
    #[arg(value_name = "BIBFILE")]
    pub input: PathBuf,

    /// Where to write the result [default: <BIBFILE stem>_modified.bib]
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Semantic Scholar API key, for a higher request quota
    #[arg(long, env = "SEMANTIC_SCHOLAR_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of the Semantic Scholar Graph API
    #[arg(long, env = "BIBDOI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Entry field holding the Semantic Scholar corpus id
    #[arg(long, value_name = "FIELD", default_value = corpus_id::DEFAULT_FIELD)]
    pub id_field: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "BIBDOI_TIMEOUT", value_name = "SECS", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout: u64,

    /// When a paper has no DOI, add its arXiv id or DBLP key instead
    #[arg(long)]
    pub fallback_ids: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only report failed lookups
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout),
        }
    }

    pub fn pipeline_config(&self) -> Config {
        Config {
            id_field: self.id_field.clone(),
            policy: MergePolicy {
                fallback_ids: self.fallback_ids,
            },
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
