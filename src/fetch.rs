//! HTTP client with browser-like default headers and referer support.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::GrabError;

/// Realistic desktop browser user agent.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,\
     image/avif,image/webp,image/apng,*/*;q=0.8";

const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// HTTP client shared by strategies and the download executor.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    referer: Option<String>,
    request_delay: Duration,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(timeout: Duration, request_delay: Duration) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            referer: None,
            request_delay,
        }
    }

    /// Set the Referer header for requests.
    pub fn with_referer(mut self, referer: String) -> Self {
        self.referer = Some(referer);
        self
    }

    /// Make a GET request.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, GrabError> {
        let mut request = self.client.get(url);
        if let Some(ref referer) = self.referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await?;

        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.to_string(), v.to_string());
            }
        }

        // Apply base delay between requests
        if self.request_delay > Duration::ZERO {
            tokio::time::sleep(self.request_delay).await;
        }

        Ok(HttpResponse {
            status: response.status(),
            headers,
            response,
        })
    }

    /// Get page content as text, requiring a success status.
    pub async fn get_text(&self, url: &str) -> Result<String, GrabError> {
        let response = self.get(url).await?;
        if !response.is_success() {
            return Err(GrabError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        response.text().await
    }

    /// Get a JSON response decoded into an explicit schema.
    ///
    /// Shape mismatch fails closed as a parse error; callers decide whether
    /// to degrade it.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GrabError> {
        let response = self.get(url).await?;
        if !response.is_success() {
            return Err(GrabError::Status {
                url: url.to_string(),
                status: response.status,
            });
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| GrabError::Parse(e.to_string()))
    }
}

/// HTTP response wrapper.
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HashMap<String, String>,
    response: reqwest::Response,
}

impl HttpResponse {
    /// Check if the response is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(|s| s.as_str())
    }

    /// Get response body as bytes.
    pub async fn bytes(self) -> Result<Vec<u8>, GrabError> {
        Ok(self.response.bytes().await.map(|b| b.to_vec())?)
    }

    /// Get response body as text.
    pub async fn text(self) -> Result<String, GrabError> {
        Ok(self.response.text().await?)
    }
}
