//! BetterTTV shared-emote search strategy.
//!
//! Translates a betterttv.com search page into CDN download targets via the
//! public shared-emote search API. No credential required.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::SiteStrategy;
use crate::error::GrabError;
use crate::fetch::HttpClient;
use crate::models::{StrategyResult, Target};

/// Shared-emote search endpoint.
const SEARCH_API_URL: &str = "https://api.betterttv.net/3/emotes/shared/search";

/// Emote CDN base.
const CDN_BASE: &str = "https://cdn.betterttv.net/emote";

/// One emote record from the search API.
#[derive(Debug, Deserialize)]
struct SharedEmote {
    id: String,
    code: String,
}

pub struct BttvStrategy {
    client: HttpClient,
    search_url: String,
    cdn_base: String,
}

impl BttvStrategy {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            search_url: SEARCH_API_URL.to_string(),
            cdn_base: CDN_BASE.to_string(),
        }
    }

    /// Point the strategy at alternate endpoints (stub servers in tests).
    pub fn with_endpoints(
        mut self,
        search_url: impl Into<String>,
        cdn_base: impl Into<String>,
    ) -> Self {
        self.search_url = search_url.into();
        self.cdn_base = cdn_base.into();
        self
    }

    /// Extract the search term from the page URL's query string.
    fn search_term(page_url: &Url) -> Option<String> {
        page_url
            .query_pairs()
            .find(|(key, _)| key == "query")
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Map one emote record to a target: largest rendition first, then the
    /// extensionless CDN fallback the site itself serves.
    fn emote_target(&self, emote: &SharedEmote) -> Option<Target> {
        let primary = Url::parse(&format!("{}/{}/3x.webp", self.cdn_base, emote.id)).ok()?;
        let fallback = Url::parse(&format!("{}/{}/3x", self.cdn_base, emote.id)).ok()?;
        Target::new(vec![primary, fallback]).map(|t| t.with_name_hint(emote.code.clone()))
    }

    async fn fetch_emotes(&self, term: &str, limit: usize) -> Result<Vec<SharedEmote>, GrabError> {
        let url = format!(
            "{}?query={}&offset=0&limit={}",
            self.search_url,
            urlencoding::encode(term),
            limit.clamp(1, 100)
        );
        self.client.get_json(&url).await
    }
}

#[async_trait]
impl SiteStrategy for BttvStrategy {
    fn name(&self) -> &'static str {
        "bttv"
    }

    fn claims(&self, page_url: &Url) -> bool {
        matches!(
            page_url.host_str(),
            Some("betterttv.com" | "www.betterttv.com")
        )
    }

    async fn resolve(&self, page_url: &Url, max_results: usize) -> StrategyResult {
        let Some(term) = Self::search_term(page_url) else {
            debug!("no query term in {}", page_url);
            return StrategyResult::Empty;
        };

        match self.fetch_emotes(&term, max_results).await {
            Ok(emotes) => {
                let targets: Vec<Target> =
                    emotes.iter().filter_map(|e| self.emote_target(e)).collect();
                if targets.is_empty() {
                    StrategyResult::Empty
                } else {
                    StrategyResult::Found(targets)
                }
            }
            Err(e) => {
                warn!("BetterTTV lookup failed for {:?}: {}", term, e);
                StrategyResult::Empty
            }
        }
    }
}
