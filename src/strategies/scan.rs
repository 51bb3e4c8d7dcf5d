//! Generic HTML/CSS page scanner.
//!
//! Fetches the raw page once and extracts accepted-format URLs from markup
//! attributes, inline style, and a format-suffix regex over the raw text
//! (which catches URLs embedded in inline scripts and JSON blobs). No byte
//! range is fetched here, so filtering is by path suffix only.

use std::collections::HashSet;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::error::GrabError;
use crate::fetch::HttpClient;
use crate::models::Target;
use crate::utils::formats;

/// Source and common lazy-load attributes checked on `img` elements.
const IMG_ATTRS: &[&str] = &["src", "data-src", "data-original", "data-lazy-src"];

pub struct PageScanner {
    client: HttpClient,
    formats: Vec<String>,
    link_regex: Regex,
    style_url_regex: Regex,
}

impl PageScanner {
    pub fn new(client: HttpClient, accepted_formats: Vec<String>) -> Self {
        // Format tokens come from user configuration and may carry regex
        // metacharacters.
        let alternation = accepted_formats
            .iter()
            .map(|f| regex::escape(f))
            .collect::<Vec<_>>()
            .join("|");
        let link_regex = Regex::new(&format!(
            r#"(?i)https?://[^\s"'<>()\\]+\.(?:{})\b"#,
            alternation
        ))
        .expect("valid link regex");
        let style_url_regex =
            Regex::new(r#"url\(\s*['"]?([^'")\s]+)['"]?\s*\)"#).expect("valid style regex");

        Self {
            client,
            formats: accepted_formats,
            link_regex,
            style_url_regex,
        }
    }

    /// Fetch the page and extract targets (one candidate URL each).
    pub async fn scan(&self, page_url: &Url, max_results: usize) -> Result<Vec<Target>, GrabError> {
        let body = self.client.get_text(page_url.as_str()).await?;
        Ok(self.extract(page_url, &body, max_results))
    }

    /// Extract accepted-format URLs from a page body.
    ///
    /// Values are resolved against the page URL, filtered by path suffix,
    /// and deduplicated preserving first-seen order.
    pub fn extract(&self, page_url: &Url, body: &str, max_results: usize) -> Vec<Target> {
        let mut raw_values: Vec<String> = Vec::new();

        {
            let document = Html::parse_document(body);

            let img = Selector::parse("img").unwrap();
            for element in document.select(&img) {
                for attr in IMG_ATTRS {
                    if let Some(value) = element.value().attr(attr) {
                        raw_values.push(value.to_string());
                    }
                }
                if let Some(srcset) = element.value().attr("srcset") {
                    raw_values.extend(split_srcset(srcset));
                }
            }

            let source = Selector::parse("source").unwrap();
            for element in document.select(&source) {
                if let Some(value) = element.value().attr("src") {
                    raw_values.push(value.to_string());
                }
                if let Some(srcset) = element.value().attr("srcset") {
                    raw_values.extend(split_srcset(srcset));
                }
            }

            let anchor = Selector::parse("a").unwrap();
            for element in document.select(&anchor) {
                if let Some(value) = element.value().attr("href") {
                    raw_values.push(value.to_string());
                }
            }

            let styled = Selector::parse("[style]").unwrap();
            for element in document.select(&styled) {
                if let Some(style) = element.value().attr("style") {
                    for capture in self.style_url_regex.captures_iter(style) {
                        raw_values.push(capture[1].to_string());
                    }
                }
            }
        }

        // Raw-text pass: absolute URLs inside scripts and JSON.
        for found in self.link_regex.find_iter(body) {
            raw_values.push(found.as_str().to_string());
        }

        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for value in raw_values {
            let value = value.trim();
            if value.is_empty()
                || value.starts_with("data:")
                || value.starts_with("javascript:")
                || value.starts_with('#')
            {
                continue;
            }
            let Ok(resolved) = page_url.join(value) else {
                continue;
            };
            if !formats::is_accepted_path(resolved.path(), &self.formats) {
                continue;
            }
            if seen.insert(resolved.to_string()) {
                targets.push(Target::single(resolved));
                if targets.len() >= max_results {
                    break;
                }
            }
        }

        debug!("scan extracted {} media URLs", targets.len());
        targets
    }
}

/// Keep only the URL part of each responsive-source entry.
fn split_srcset(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(|entry| entry.trim().split_whitespace().next())
        .map(String::from)
        .collect()
}
