//! Looking corpus ids up against the Semantic Scholar Graph API.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::identifier::{CorpusId, doi};

pub const DEFAULT_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// What a metadata service knows about one paper. Every id is optional; plenty of papers
/// have no DOI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataResult {
    pub doi: Option<String>,
    pub arxiv: Option<String>,
    pub dblp: Option<String>,
}

/// Why a single lookup did not produce a result. Never fatal to a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupFailure {
    #[error("request timed out")]
    Timeout,
    #[error("quota exceeded (HTTP 429)")]
    QuotaExceeded,
    #[error("paper not found (HTTP 404)")]
    NotFound,
    #[error("service answered HTTP {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl LookupFailure {
    pub fn is_quota(&self) -> bool {
        matches!(self, LookupFailure::QuotaExceeded)
    }
}

impl From<ureq::Error> for LookupFailure {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(429) => LookupFailure::QuotaExceeded,
            ureq::Error::StatusCode(404) => LookupFailure::NotFound,
            ureq::Error::StatusCode(code) => LookupFailure::Status(code),
            ureq::Error::Timeout(_) => LookupFailure::Timeout,
            ureq::Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                LookupFailure::Timeout
            }
            other => LookupFailure::Transport(other.to_string()),
        }
    }
}

/// Anything that can answer "which external ids does this paper have?".
pub trait MetadataSource {
    fn lookup(&self, id: CorpusId) -> Result<MetadataResult, LookupFailure>;
}

impl<S: MetadataSource + ?Sized> MetadataSource for &S {
    fn lookup(&self, id: CorpusId) -> Result<MetadataResult, LookupFailure> {
        (**self).lookup(id)
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Raises the per-key quota; the free tier works without one.
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Blocking Semantic Scholar client. One request per lookup, no retries.
pub struct SemanticScholar {
    agent: ureq::Agent,
    base_url: Url,
    api_key: Option<String>,
}

impl SemanticScholar {
    pub fn new(config: &ClientConfig) -> Result<Self, url::ParseError> {
        let base = config.base_url.trim_end_matches('/');
        // A trailing slash makes `join` append rather than replace the last segment.
        let base_url = Url::parse(&format!("{base}/"))?;
        let cfg = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build();
        Ok(Self {
            agent: ureq::Agent::new_with_config(cfg),
            base_url,
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn paper_url(&self, id: CorpusId) -> Result<Url, url::ParseError> {
        let mut url = self.base_url.join(&format!("paper/CorpusId:{id}"))?;
        url.query_pairs_mut().append_pair("fields", "externalIds");
        Ok(url)
    }
}

impl MetadataSource for SemanticScholar {
    fn lookup(&self, id: CorpusId) -> Result<MetadataResult, LookupFailure> {
        let url = self
            .paper_url(id)
            .map_err(|e| LookupFailure::Transport(e.to_string()))?;
        tracing::debug!(%url, "looking up paper");

        let mut req = self.agent.get(url.as_str()).header("User-Agent", USER_AGENT);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }
        let body = req.call()?.into_body().read_to_string()?;
        parse_paper(&body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaperResponse {
    #[serde(default)]
    external_ids: Option<ExternalIds>,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
    #[serde(rename = "DBLP")]
    dblp: Option<String>,
}

fn parse_paper(body: &str) -> Result<MetadataResult, LookupFailure> {
    let paper: PaperResponse = serde_json::from_str(body)
        .map_err(|e| LookupFailure::MalformedResponse(e.to_string()))?;
    let ids = paper.external_ids.unwrap_or_default();

    let doi = ids.doi.filter(|d| !d.trim().is_empty()).and_then(|raw| {
        let normalized = doi::normalize(&raw);
        if normalized.is_none() {
            tracing::warn!(doi = %raw, "ignoring malformed DOI from service");
        }
        normalized
    });
    let non_empty = |v: Option<String>| {
        v.map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    Ok(MetadataResult {
        doi,
        arxiv: non_empty(ids.arxiv),
        dblp: non_empty(ids.dblp),
    })
}
