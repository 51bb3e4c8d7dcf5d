//! Giphy search strategy.
//!
//! Requires `GIPHY_API_KEY` in the environment; its absence is surfaced as a
//! skip notice, not an error exit.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::SiteStrategy;
use crate::config::{self, GIPHY_API_KEY_VAR};
use crate::error::GrabError;
use crate::fetch::HttpClient;
use crate::models::{StrategyResult, Target};

const SEARCH_API_URL: &str = "https://api.giphy.com/v1/gifs/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<Gif>,
}

#[derive(Debug, Deserialize)]
struct Gif {
    #[serde(default)]
    title: String,
    #[serde(default)]
    slug: String,
    images: Images,
}

#[derive(Debug, Deserialize)]
struct Images {
    #[serde(default)]
    original: Option<Rendition>,
    #[serde(default)]
    downsized: Option<Rendition>,
}

#[derive(Debug, Default, Deserialize)]
struct Rendition {
    #[serde(default)]
    url: String,
    #[serde(default)]
    webp: String,
}

pub struct GiphyStrategy {
    client: HttpClient,
}

impl GiphyStrategy {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Term from `/search/<term>` (hyphen-separated) or a `q` parameter.
    fn search_term(page_url: &Url) -> Option<String> {
        if let Some(q) = page_url
            .query_pairs()
            .find(|(key, _)| key == "q")
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
        {
            return Some(q);
        }

        let mut segments = page_url.path_segments()?;
        match (segments.next(), segments.next()) {
            (Some("search"), Some(term)) if !term.is_empty() => {
                Some(term.replace('-', " "))
            }
            _ => None,
        }
    }

    /// Quality tiers: original webp, original gif, downsized gif.
    fn gif_target(gif: &Gif) -> Option<Target> {
        let mut raw_urls = Vec::new();
        if let Some(original) = &gif.images.original {
            raw_urls.push(original.webp.as_str());
            raw_urls.push(original.url.as_str());
        }
        if let Some(downsized) = &gif.images.downsized {
            raw_urls.push(downsized.url.as_str());
        }

        let candidates: Vec<Url> = raw_urls
            .into_iter()
            .filter(|raw| !raw.is_empty())
            .filter_map(|raw| Url::parse(raw).ok())
            .collect();

        let name = if gif.title.trim().is_empty() {
            gif.slug.clone()
        } else {
            gif.title.clone()
        };

        let target = Target::new(candidates)?;
        Some(if name.trim().is_empty() {
            target
        } else {
            target.with_name_hint(name)
        })
    }

    async fn fetch_gifs(
        &self,
        key: &str,
        term: &str,
        limit: usize,
    ) -> Result<SearchResponse, GrabError> {
        let url = format!(
            "{}?api_key={}&q={}&limit={}",
            SEARCH_API_URL,
            urlencoding::encode(key),
            urlencoding::encode(term),
            limit.clamp(1, 50)
        );
        self.client.get_json(&url).await
    }
}

#[async_trait]
impl SiteStrategy for GiphyStrategy {
    fn name(&self) -> &'static str {
        "giphy"
    }

    fn claims(&self, page_url: &Url) -> bool {
        page_url
            .host_str()
            .is_some_and(|host| host == "giphy.com" || host.ends_with(".giphy.com"))
    }

    async fn resolve(&self, page_url: &Url, max_results: usize) -> StrategyResult {
        let Some(key) = config::api_key(GIPHY_API_KEY_VAR) else {
            return StrategyResult::CredentialMissing(GIPHY_API_KEY_VAR);
        };
        let Some(term) = Self::search_term(page_url) else {
            debug!("no search term in {}", page_url);
            return StrategyResult::Empty;
        };

        match self.fetch_gifs(&key, &term, max_results).await {
            Ok(response) => {
                let targets: Vec<Target> =
                    response.data.iter().filter_map(Self::gif_target).collect();
                if targets.is_empty() {
                    StrategyResult::Empty
                } else {
                    StrategyResult::Found(targets)
                }
            }
            Err(e) => {
                warn!("Giphy lookup failed for {:?}: {}", term, e);
                StrategyResult::Empty
            }
        }
    }
}
