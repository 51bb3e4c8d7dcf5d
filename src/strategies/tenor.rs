//! Tenor v2 search strategy.
//!
//! Requires `TENOR_API_KEY` in the environment; its absence is surfaced as a
//! skip notice, not an error exit.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::SiteStrategy;
use crate::config::{self, TENOR_API_KEY_VAR};
use crate::error::GrabError;
use crate::fetch::HttpClient;
use crate::models::{StrategyResult, Target};

const SEARCH_API_URL: &str = "https://tenor.googleapis.com/v2/search";

/// Media formats requested from the API, preference order.
const MEDIA_TIERS: &[&str] = &["webp", "gif", "tinygif"];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content_description: String,
    #[serde(default)]
    media_formats: HashMap<String, MediaFormat>,
}

#[derive(Debug, Deserialize)]
struct MediaFormat {
    url: String,
}

pub struct TenorStrategy {
    client: HttpClient,
}

impl TenorStrategy {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Term from `/search/<term>` (Tenor appends a `-gifs` suffix) or `q`.
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
                let term = term.strip_suffix("-gifs").unwrap_or(term);
                Some(term.replace('-', " "))
            }
            _ => None,
        }
    }

    fn post_target(post: &Post) -> Option<Target> {
        let candidates: Vec<Url> = MEDIA_TIERS
            .iter()
            .filter_map(|tier| post.media_formats.get(*tier))
            .filter(|format| !format.url.is_empty())
            .filter_map(|format| Url::parse(&format.url).ok())
            .collect();

        let name = if post.content_description.trim().is_empty() {
            post.title.clone()
        } else {
            post.content_description.clone()
        };

        let target = Target::new(candidates)?;
        Some(if name.trim().is_empty() {
            target
        } else {
            target.with_name_hint(name)
        })
    }

    async fn fetch_posts(
        &self,
        key: &str,
        term: &str,
        limit: usize,
    ) -> Result<SearchResponse, GrabError> {
        let url = format!(
            "{}?key={}&q={}&limit={}&media_filter={}",
            SEARCH_API_URL,
            urlencoding::encode(key),
            urlencoding::encode(term),
            limit.clamp(1, 50),
            MEDIA_TIERS.join(",")
        );
        self.client.get_json(&url).await
    }
}

#[async_trait]
impl SiteStrategy for TenorStrategy {
    fn name(&self) -> &'static str {
        "tenor"
    }

    fn claims(&self, page_url: &Url) -> bool {
        matches!(page_url.host_str(), Some("tenor.com" | "www.tenor.com"))
    }

    async fn resolve(&self, page_url: &Url, max_results: usize) -> StrategyResult {
        let Some(key) = config::api_key(TENOR_API_KEY_VAR) else {
            return StrategyResult::CredentialMissing(TENOR_API_KEY_VAR);
        };
        let Some(term) = Self::search_term(page_url) else {
            debug!("no search term in {}", page_url);
            return StrategyResult::Empty;
        };

        match self.fetch_posts(&key, &term, max_results).await {
            Ok(response) => {
                let targets: Vec<Target> =
                    response.results.iter().filter_map(Self::post_target).collect();
                if targets.is_empty() {
                    StrategyResult::Empty
                } else {
                    StrategyResult::Found(targets)
                }
            }
            Err(e) => {
                warn!("Tenor lookup failed for {:?}: {}", term, e);
                StrategyResult::Empty
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_term_trims_gifs_suffix() {
        let url = Url::parse("https://tenor.com/search/excited-cat-gifs").unwrap();
        assert_eq!(TenorStrategy::search_term(&url), Some("excited cat".to_string()));

        let plain = Url::parse("https://tenor.com/search/pog").unwrap();
        assert_eq!(TenorStrategy::search_term(&plain), Some("pog".to_string()));

        let none = Url::parse("https://tenor.com/official/terms").unwrap();
        assert_eq!(TenorStrategy::search_term(&none), None);
    }

    #[test]
    fn post_candidates_follow_media_tiers() {
        let mut formats = HashMap::new();
        formats.insert(
            "gif".to_string(),
            MediaFormat {
                url: "https://media.tenor.com/x.gif".to_string(),
            },
        );
        formats.insert(
            "webp".to_string(),
            MediaFormat {
                url: "https://media.tenor.com/x.webp".to_string(),
            },
        );
        let post = Post {
            title: "fallback".to_string(),
            content_description: "excited cat".to_string(),
            media_formats: formats,
        };

        let target = TenorStrategy::post_target(&post).unwrap();
        let urls: Vec<&str> = target.candidates().iter().map(|u| u.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://media.tenor.com/x.webp", "https://media.tenor.com/x.gif"]
        );
        assert_eq!(target.name_hint.as_deref(), Some("excited cat"));
    }

    #[test]
    fn post_without_formats_is_skipped() {
        let post = Post {
            title: String::new(),
            content_description: String::new(),
            media_formats: HashMap::new(),
        };
        assert!(TenorStrategy::post_target(&post).is_none());
    }
}
