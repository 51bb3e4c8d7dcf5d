//! Discovery strategies and the resolution pipeline.
//!
//! Strategies are evaluated in one declarative priority order: site API
//! lookups first, then the generic page scan, then live browser capture as
//! the universal last resort. A site strategy that claims a URL shape is
//! authoritative for it; its result (even an empty one) ends the run.

pub mod bttv;
pub mod capture;
pub mod ffz;
pub mod giphy;
pub mod scan;
pub mod tenor;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Settings;
use crate::fetch::HttpClient;
use crate::models::{StrategyResult, Target};

pub use capture::{CaptureProgress, CaptureStrategy};
pub use scan::PageScanner;

/// A pluggable discovery method keyed to a well-known host.
///
/// `claims` is a pure URL/host/path pattern match with no network I/O;
/// `resolve` performs the authoritative lookup for a claimed URL.
#[async_trait]
pub trait SiteStrategy: Send + Sync {
    /// Unique identifier for this strategy (e.g. "bttv").
    fn name(&self) -> &'static str;

    /// Whether this strategy owns the given page URL's shape.
    fn claims(&self, page_url: &Url) -> bool;

    /// Resolve a claimed page URL into targets.
    ///
    /// Network or parse failure is logged and degraded to
    /// [`StrategyResult::Empty`]: failing to retrieve data is not grounds
    /// to hand the URL to a different strategy.
    async fn resolve(&self, page_url: &Url, max_results: usize) -> StrategyResult;
}

/// Ordered registry of site strategies.
pub struct StrategyRegistry {
    sites: Vec<Arc<dyn SiteStrategy>>,
}

impl StrategyRegistry {
    /// Create a registry with all built-in site strategies, in priority order.
    pub fn new(client: HttpClient) -> Self {
        let sites: Vec<Arc<dyn SiteStrategy>> = vec![
            Arc::new(bttv::BttvStrategy::new(client.clone())),
            Arc::new(ffz::FfzStrategy::new(client.clone())),
            Arc::new(giphy::GiphyStrategy::new(client.clone())),
            Arc::new(tenor::TenorStrategy::new(client)),
        ];
        Self { sites }
    }

    /// Create a registry from an explicit strategy list (tests).
    pub fn with_sites(sites: Vec<Arc<dyn SiteStrategy>>) -> Self {
        Self { sites }
    }

    /// Strategies in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SiteStrategy>> {
        self.sites.iter()
    }
}

/// How the final target list was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedVia {
    Site(&'static str),
    Scan,
    Capture,
    Nothing,
}

/// Result of running the full pipeline against a page URL.
#[derive(Debug)]
pub struct ResolutionOutcome {
    /// Targets in discovery order, truncated to the run cap.
    pub targets: Vec<Target>,
    pub via: ResolvedVia,
    /// User-visible note when a claiming strategy ended the run early
    /// (empty claim or missing credential).
    pub notice: Option<String>,
}

impl ResolutionOutcome {
    fn empty(via: ResolvedVia, notice: Option<String>) -> Self {
        Self {
            targets: Vec::new(),
            via,
            notice,
        }
    }
}

/// The ordered resolution pipeline.
pub struct Pipeline {
    registry: StrategyRegistry,
    scanner: PageScanner,
    capture: Option<CaptureStrategy>,
}

impl Pipeline {
    /// Build the pipeline for one run.
    pub fn new(client: HttpClient, settings: &Settings) -> Self {
        let registry = StrategyRegistry::new(client.clone());
        let scanner = PageScanner::new(client, settings.formats.clone());
        let capture = settings.capture.enabled.then(|| {
            CaptureStrategy::new(settings.capture.clone(), settings.formats.clone())
        });
        Self {
            registry,
            scanner,
            capture,
        }
    }

    /// Build a pipeline with explicit parts (tests).
    pub fn with_parts(
        registry: StrategyRegistry,
        scanner: PageScanner,
        capture: Option<CaptureStrategy>,
    ) -> Self {
        Self {
            registry,
            scanner,
            capture,
        }
    }

    /// Resolve a page URL into at most `max_results` targets.
    ///
    /// Site strategies are tried in priority order; the first claiming
    /// strategy decides the outcome. Unclaimed URLs fall through to the
    /// page scanner, then to live capture when the scan is empty or fails.
    pub async fn resolve(
        &self,
        page_url: &Url,
        max_results: usize,
        capture_progress: Option<mpsc::Sender<CaptureProgress>>,
    ) -> ResolutionOutcome {
        for strategy in self.registry.iter() {
            if !strategy.claims(page_url) {
                continue;
            }
            info!("{} claims {}", strategy.name(), page_url);

            match strategy.resolve(page_url, max_results).await {
                StrategyResult::Found(mut targets) => {
                    targets.truncate(max_results);
                    return ResolutionOutcome {
                        targets,
                        via: ResolvedVia::Site(strategy.name()),
                        notice: None,
                    };
                }
                StrategyResult::Empty => {
                    return ResolutionOutcome::empty(
                        ResolvedVia::Site(strategy.name()),
                        Some(format!(
                            "{} matched this page but returned no results",
                            strategy.name()
                        )),
                    );
                }
                StrategyResult::CredentialMissing(var) => {
                    return ResolutionOutcome::empty(
                        ResolvedVia::Site(strategy.name()),
                        Some(format!(
                            "skipped {}: set {} to enable this lookup",
                            strategy.name(),
                            var
                        )),
                    );
                }
                StrategyResult::NotApplicable => continue,
            }
        }

        match self.scanner.scan(page_url, max_results).await {
            Ok(targets) if !targets.is_empty() => {
                return ResolutionOutcome {
                    targets,
                    via: ResolvedVia::Scan,
                    notice: None,
                };
            }
            Ok(_) => debug!("page scan found no accepted media in {}", page_url),
            Err(e) => warn!("page scan failed for {}: {}", page_url, e),
        }

        if let Some(ref capture) = self.capture {
            match capture.capture(page_url, max_results, capture_progress).await {
                Ok(records) => {
                    let targets: Vec<Target> = records
                        .into_iter()
                        .filter_map(|record| Url::parse(&record.url).ok().map(Target::single))
                        .take(max_results)
                        .collect();
                    if !targets.is_empty() {
                        return ResolutionOutcome {
                            targets,
                            via: ResolvedVia::Capture,
                            notice: None,
                        };
                    }
                }
                Err(e) => warn!("live capture failed for {}: {}", page_url, e),
            }
        }

        ResolutionOutcome::empty(ResolvedVia::Nothing, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct StubStrategy {
        name: &'static str,
        host: &'static str,
        result: fn() -> StrategyResult,
    }

    #[async_trait]
    impl SiteStrategy for StubStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn claims(&self, page_url: &Url) -> bool {
            page_url.host_str() == Some(self.host)
        }

        async fn resolve(&self, _page_url: &Url, _max_results: usize) -> StrategyResult {
            (self.result)()
        }
    }

    fn target(url: &str) -> Target {
        Target::single(Url::parse(url).unwrap())
    }

    fn pipeline_with(sites: Vec<Arc<dyn SiteStrategy>>) -> Pipeline {
        let client = HttpClient::new(Duration::from_secs(1), Duration::ZERO);
        Pipeline::with_parts(
            StrategyRegistry::with_sites(sites),
            PageScanner::new(client, vec!["webp".to_string(), "gif".to_string()]),
            None,
        )
    }

    #[tokio::test]
    async fn first_claiming_strategy_wins() {
        let pipeline = pipeline_with(vec![
            Arc::new(StubStrategy {
                name: "first",
                host: "emotes.example",
                result: || StrategyResult::Found(vec![target("https://cdn.example/a.webp")]),
            }),
            Arc::new(StubStrategy {
                name: "second",
                host: "emotes.example",
                result: || StrategyResult::Found(vec![target("https://cdn.example/b.webp")]),
            }),
        ]);

        let url = Url::parse("https://emotes.example/search?q=pog").unwrap();
        let outcome = pipeline.resolve(&url, 100, None).await;
        assert_eq!(outcome.via, ResolvedVia::Site("first"));
        assert_eq!(outcome.targets.len(), 1);
        assert_eq!(
            outcome.targets[0].candidates()[0].as_str(),
            "https://cdn.example/a.webp"
        );
    }

    #[tokio::test]
    async fn empty_claim_does_not_fall_through() {
        let pipeline = pipeline_with(vec![
            Arc::new(StubStrategy {
                name: "owner",
                host: "emotes.example",
                result: || StrategyResult::Empty,
            }),
            Arc::new(StubStrategy {
                name: "lower",
                host: "emotes.example",
                result: || StrategyResult::Found(vec![target("https://cdn.example/b.webp")]),
            }),
        ]);

        let url = Url::parse("https://emotes.example/search?q=pog").unwrap();
        let outcome = pipeline.resolve(&url, 100, None).await;
        assert!(outcome.targets.is_empty());
        assert_eq!(outcome.via, ResolvedVia::Site("owner"));
        assert!(outcome.notice.unwrap().contains("no results"));
    }

    #[tokio::test]
    async fn credential_missing_reports_skip_notice() {
        let pipeline = pipeline_with(vec![Arc::new(StubStrategy {
            name: "keyed",
            host: "gifs.example",
            result: || StrategyResult::CredentialMissing("EXAMPLE_API_KEY"),
        })]);

        let url = Url::parse("https://gifs.example/search/pog").unwrap();
        let outcome = pipeline.resolve(&url, 100, None).await;
        assert!(outcome.targets.is_empty());
        assert!(outcome.notice.unwrap().contains("EXAMPLE_API_KEY"));
    }

    #[tokio::test]
    async fn found_targets_are_capped_preserving_order() {
        fn many() -> StrategyResult {
            let targets = (0..150)
                .map(|i| target(&format!("https://cdn.example/{}.gif", i)))
                .collect();
            StrategyResult::Found(targets)
        }

        let pipeline = pipeline_with(vec![Arc::new(StubStrategy {
            name: "bulk",
            host: "emotes.example",
            result: many,
        })]);

        let url = Url::parse("https://emotes.example/all").unwrap();
        let outcome = pipeline.resolve(&url, 100, None).await;
        assert_eq!(outcome.targets.len(), 100);
        assert_eq!(
            outcome.targets[99].candidates()[0].as_str(),
            "https://cdn.example/99.gif"
        );
    }

    #[tokio::test]
    async fn non_claiming_strategies_are_skipped() {
        let pipeline = pipeline_with(vec![Arc::new(StubStrategy {
            name: "elsewhere",
            host: "other.example",
            result: || StrategyResult::Found(vec![target("https://cdn.example/a.webp")]),
        })]);

        // No strategy claims this host and the scan against a closed port
        // fails, so the run resolves to nothing.
        let url = Url::parse("http://127.0.0.1:1/page").unwrap();
        let outcome = pipeline.resolve(&url, 100, None).await;
        assert!(outcome.targets.is_empty());
        assert_eq!(outcome.via, ResolvedVia::Nothing);
    }
}
