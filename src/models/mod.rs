//! Core data model for target resolution and download.

use std::path::PathBuf;

use url::Url;

use crate::error::GrabError;

/// One logical file to download, carrying one or more candidate source URLs
/// in preference order.
#[derive(Debug, Clone)]
pub struct Target {
    candidate_urls: Vec<Url>,
    /// Display-name hint from the discovering strategy.
    pub name_hint: Option<String>,
}

impl Target {
    /// Create a target from candidate URLs, best first.
    ///
    /// Returns `None` for an empty list; a strategy never emits a target
    /// without at least one candidate.
    pub fn new(candidate_urls: Vec<Url>) -> Option<Self> {
        if candidate_urls.is_empty() {
            return None;
        }
        Some(Self {
            candidate_urls,
            name_hint: None,
        })
    }

    /// Create a target with a single candidate URL.
    pub fn single(url: Url) -> Self {
        Self {
            candidate_urls: vec![url],
            name_hint: None,
        }
    }

    /// Attach a display-name hint.
    pub fn with_name_hint(mut self, hint: impl Into<String>) -> Self {
        self.name_hint = Some(hint.into());
        self
    }

    /// Candidate URLs in preference order. Never empty.
    pub fn candidates(&self) -> &[Url] {
        &self.candidate_urls
    }
}

/// Tri-state outcome of invoking a strategy against a page URL.
///
/// The distinction between `NotApplicable` and `Empty` is what keeps a
/// site strategy authoritative: once a strategy claims a URL shape, an
/// empty result stops the pipeline rather than falling through to a
/// generic scan that could return unrelated matches.
#[derive(Debug)]
pub enum StrategyResult {
    /// The strategy does not own this URL shape; the pipeline continues.
    NotApplicable,
    /// The strategy owns this URL shape but found zero results.
    Empty,
    /// The strategy owns this URL shape but a required credential is
    /// absent from the environment. Carries the variable name.
    CredentialMissing(&'static str),
    /// Targets found, in discovery order.
    Found(Vec<Target>),
}

/// One network response observed by the live capture strategy.
#[derive(Debug, Clone)]
pub struct CaptureRecord {
    pub url: String,
    pub content_type: String,
}

/// Per-run state: the page being resolved and where files land.
///
/// Created once per invocation; the output directory is freshly
/// timestamped and never reused across runs.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub page_url: Url,
    pub output_dir: PathBuf,
    pub max_downloads: usize,
}

impl RunContext {
    /// Create a context with a run-scoped output directory under the CWD.
    pub fn new(page_url: Url, max_downloads: usize) -> Self {
        let output_dir = run_output_dir(&page_url);
        Self {
            page_url,
            output_dir,
            max_downloads,
        }
    }

    /// Override the output directory (CLI `--out`).
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Referer sent with every download request.
    pub fn referer(&self) -> &str {
        self.page_url.as_str()
    }
}

/// Build `downloads_<host>_<YYYYMMDD-HHMMSS>` for a page URL.
fn run_output_dir(page_url: &Url) -> PathBuf {
    let mut host = page_url.host_str().unwrap_or("site").to_string();
    if let Some(port) = page_url.port() {
        // Mirrors netloc handling: the `:` is not filesystem-safe.
        host.push('_');
        host.push_str(&port.to_string());
    }
    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S");
    PathBuf::from(format!("downloads_{}_{}", host, ts))
}

/// Per-target result recorded by the download executor.
#[derive(Debug)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    Failed(GrabError),
}

/// Final tally for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ok_count: usize,
    pub fail_count: usize,
}
