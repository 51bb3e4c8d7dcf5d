//! FrankerFaceZ emoticon search strategy.
//!
//! Only animated emotes are mapped: static FFZ renditions are PNG, which is
//! outside the accepted format set. No credential required.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::SiteStrategy;
use crate::error::GrabError;
use crate::fetch::HttpClient;
use crate::models::{StrategyResult, Target};

const SEARCH_API_URL: &str = "https://api.frankerfacez.com/v1/emoticons";

/// Quality tiers, largest first. Keys of the `animated` URL map.
const TIERS: &[&str] = &["4", "2", "1"];

#[derive(Debug, Deserialize)]
struct EmoticonPage {
    emoticons: Vec<Emoticon>,
}

#[derive(Debug, Deserialize)]
struct Emoticon {
    name: String,
    /// Animated rendition URLs keyed by scale; absent for static emotes.
    #[serde(default)]
    animated: Option<HashMap<String, String>>,
}

pub struct FfzStrategy {
    client: HttpClient,
}

impl FfzStrategy {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Search term from `q` or the path segment after `search`.
    fn search_term(page_url: &Url) -> Option<String> {
        if let Some(q) = page_url
            .query_pairs()
            .find(|(key, _)| key == "q")
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
        {
            return Some(q);
        }

        let segments: Vec<&str> = page_url.path_segments()?.collect();
        segments
            .iter()
            .position(|s| *s == "search")
            .and_then(|i| segments.get(i + 1))
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty())
    }

    /// API URLs in the payload are protocol-relative.
    fn absolute(raw: &str) -> String {
        if let Some(rest) = raw.strip_prefix("//") {
            format!("https://{}", rest)
        } else {
            raw.to_string()
        }
    }

    fn emote_target(emote: &Emoticon) -> Option<Target> {
        let animated = emote.animated.as_ref()?;
        let candidates: Vec<Url> = TIERS
            .iter()
            .filter_map(|tier| animated.get(*tier))
            .filter_map(|raw| {
                let raw = Self::absolute(raw);
                // The animated endpoint negotiates by extension.
                let with_ext = if raw.ends_with(".webp") {
                    raw
                } else {
                    format!("{}.webp", raw)
                };
                Url::parse(&with_ext).ok()
            })
            .collect();
        Target::new(candidates).map(|t| t.with_name_hint(emote.name.clone()))
    }

    async fn fetch_emoticons(&self, term: &str, limit: usize) -> Result<EmoticonPage, GrabError> {
        let url = format!(
            "{}?q={}&sort=count-desc&per_page={}",
            SEARCH_API_URL,
            urlencoding::encode(term),
            limit.clamp(1, 200)
        );
        self.client.get_json(&url).await
    }
}

#[async_trait]
impl SiteStrategy for FfzStrategy {
    fn name(&self) -> &'static str {
        "frankerfacez"
    }

    fn claims(&self, page_url: &Url) -> bool {
        matches!(
            page_url.host_str(),
            Some("frankerfacez.com" | "www.frankerfacez.com")
        )
    }

    async fn resolve(&self, page_url: &Url, max_results: usize) -> StrategyResult {
        let Some(term) = Self::search_term(page_url) else {
            debug!("no search term in {}", page_url);
            return StrategyResult::Empty;
        };

        match self.fetch_emoticons(&term, max_results).await {
            Ok(page) => {
                let targets: Vec<Target> =
                    page.emoticons.iter().filter_map(Self::emote_target).collect();
                if targets.is_empty() {
                    StrategyResult::Empty
                } else {
                    StrategyResult::Found(targets)
                }
            }
            Err(e) => {
                warn!("FrankerFaceZ lookup failed for {:?}: {}", term, e);
                StrategyResult::Empty
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_term_from_query_or_path() {
        let q = Url::parse("https://www.frankerfacez.com/emoticons/?q=pog").unwrap();
        assert_eq!(FfzStrategy::search_term(&q), Some("pog".to_string()));

        let path = Url::parse("https://www.frankerfacez.com/emoticons/search/pog").unwrap();
        assert_eq!(FfzStrategy::search_term(&path), Some("pog".to_string()));

        let none = Url::parse("https://www.frankerfacez.com/emoticons/").unwrap();
        assert_eq!(FfzStrategy::search_term(&none), None);
    }

    #[test]
    fn static_emotes_are_skipped() {
        let emote = Emoticon {
            name: "StaticFace".to_string(),
            animated: None,
        };
        assert!(FfzStrategy::emote_target(&emote).is_none());
    }

    #[test]
    fn animated_tiers_in_quality_order() {
        let mut animated = HashMap::new();
        animated.insert("1".to_string(), "//cdn.frankerfacez.com/emote/9/animated/1".to_string());
        animated.insert("4".to_string(), "//cdn.frankerfacez.com/emote/9/animated/4".to_string());
        let emote = Emoticon {
            name: "DanceFace".to_string(),
            animated: Some(animated),
        };

        let target = FfzStrategy::emote_target(&emote).unwrap();
        let urls: Vec<&str> = target.candidates().iter().map(|u| u.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.frankerfacez.com/emote/9/animated/4.webp",
                "https://cdn.frankerfacez.com/emote/9/animated/1.webp",
            ]
        );
        assert_eq!(target.name_hint.as_deref(), Some("DanceFace"));
    }
}
