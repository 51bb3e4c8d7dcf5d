//! Live capture strategy.
//!
//! Renders the page in Chrome via CDP, listens to network responses, and
//! records image-typed responses matching the accepted formats. Used as the
//! universal last resort when no site strategy claims the URL and the
//! static scan comes up empty.

#[cfg(feature = "browser")]
use std::collections::HashSet;
#[cfg(feature = "browser")]
use std::time::Duration;

use tokio::sync::mpsc;
use url::Url;

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::{
    EventResponseReceived, Headers, ResourceType, SetExtraHttpHeadersParams,
    SetUserAgentOverrideParams,
};
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

use crate::config::CaptureSettings;
use crate::error::GrabError;
use crate::models::CaptureRecord;
#[cfg(feature = "browser")]
use crate::utils::formats;

/// Incremental progress signal: responses captured so far.
#[derive(Debug, Clone, Copy)]
pub struct CaptureProgress {
    pub captured: usize,
}

/// Accept header sent with page requests to prefer the formats we keep.
#[cfg(feature = "browser")]
const CAPTURE_ACCEPT: &str = "image/webp,image/gif,image/apng,image/*,*/*;q=0.8";

pub struct CaptureStrategy {
    settings: CaptureSettings,
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    formats: Vec<String>,
}

#[cfg(feature = "browser")]
impl CaptureStrategy {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    pub fn new(settings: CaptureSettings, formats: Vec<String>) -> Self {
        Self { settings, formats }
    }

    /// Find a Chrome executable.
    fn find_chrome() -> Result<std::path::PathBuf, GrabError> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        info!("Found Chrome in PATH: {}", path);
                        return Ok(std::path::PathBuf::from(path));
                    }
                }
            }
        }

        Err(GrabError::Browser(
            "Chrome/Chromium not found; install it or disable live capture".to_string(),
        ))
    }

    /// Launch a headless browser and spawn its handler task.
    async fn launch(&self) -> Result<Browser, GrabError> {
        let chrome_path = Self::find_chrome()?;

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // Set headless mode (with_head means NOT headless, confusingly)
        if !self.settings.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--metrics-recording-only")
            .arg("--no-sandbox") // Often needed for headless in containers/restricted environments
            .arg("--disable-gpu")
            .arg("--disable-software-rasterizer");

        let config = builder
            .build()
            .map_err(|e| GrabError::Browser(format!("failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| GrabError::Browser(format!("failed to launch browser: {}", e)))?;

        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    /// Render the page and capture matching network responses.
    ///
    /// The response listener is registered before navigation; the page-load
    /// wait tolerates timeout; listening continues for the configured
    /// capture window or until `max_results` records are collected.
    pub async fn capture(
        &self,
        page_url: &Url,
        max_results: usize,
        progress: Option<mpsc::Sender<CaptureProgress>>,
    ) -> Result<Vec<CaptureRecord>, GrabError> {
        let mut browser = self.launch().await?;
        let result = self
            .capture_on(&mut browser, page_url, max_results, progress)
            .await;
        let _ = browser.close().await;
        result
    }

    async fn capture_on(
        &self,
        browser: &mut Browser,
        page_url: &Url,
        max_results: usize,
        progress: Option<mpsc::Sender<CaptureProgress>>,
    ) -> Result<Vec<CaptureRecord>, GrabError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| GrabError::Browser(e.to_string()))?;

        page.execute(SetUserAgentOverrideParams::new(
            crate::fetch::USER_AGENT.to_string(),
        ))
        .await
        .map_err(|e| GrabError::Browser(e.to_string()))?;

        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            serde_json::json!({
                "Accept": CAPTURE_ACCEPT,
                "Accept-Language": "en-US,en;q=0.9",
            }),
        )))
        .await
        .map_err(|e| GrabError::Browser(e.to_string()))?;

        // Register the listener before navigation so early responses are
        // not missed; matching records flow through a bounded channel.
        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| GrabError::Browser(e.to_string()))?;

        let (record_tx, mut record_rx) = mpsc::channel::<CaptureRecord>(256);
        let accepted = self.formats.clone();
        let listener = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.r#type != ResourceType::Image {
                    continue;
                }
                let response = &event.response;
                if !(200..300).contains(&response.status) {
                    continue;
                }
                let url_ok = formats::is_accepted_path(&response.url, &accepted);
                let mime_ok = formats::is_accepted_mime(&response.mime_type, &accepted);
                if !url_ok && !mime_ok {
                    continue;
                }
                let record = CaptureRecord {
                    url: response.url.clone(),
                    content_type: response.mime_type.clone(),
                };
                if record_tx.send(record).await.is_err() {
                    break;
                }
            }
        });

        info!("Navigating to {}", page_url);
        let nav_params = NavigateParams::builder()
            .url(page_url.as_str())
            .build()
            .map_err(|e| GrabError::Browser(format!("invalid URL: {}", e)))?;
        page.execute(nav_params)
            .await
            .map_err(|e| GrabError::Browser(e.to_string()))?;

        self.wait_for_ready(&page).await;

        // Scroll to trigger lazy loading, stopping early once the page
        // height repeats (fixed point), then keep draining the channel.
        let mut last_height: Option<i64> = None;
        for step in 0..self.settings.scroll_steps {
            match self.scroll_to_bottom(&page).await {
                Ok(height) => {
                    if last_height == Some(height) {
                        debug!("page height stabilized at {} after {} scrolls", height, step);
                        break;
                    }
                    last_height = Some(height);
                }
                Err(e) => {
                    debug!("scroll step failed: {}", e);
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(self.settings.scroll_delay_ms)).await;
        }

        let deadline =
            tokio::time::Instant::now() + Duration::from_secs(self.settings.window_secs);
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        while records.len() < max_results {
            let next = tokio::time::timeout_at(deadline, record_rx.recv()).await;
            match next {
                Ok(Some(record)) => {
                    if seen.insert(record.url.clone()) {
                        records.push(record);
                        if let Some(ref tx) = progress {
                            let _ = tx
                                .send(CaptureProgress {
                                    captured: records.len(),
                                })
                                .await;
                        }
                    }
                }
                // Channel closed or capture window elapsed.
                Ok(None) | Err(_) => break,
            }
        }

        listener.abort();
        let _ = page.close().await;

        info!("captured {} image responses", records.len());
        Ok(records)
    }

    /// Wait for the page's ready state, tolerating timeout as non-fatal.
    async fn wait_for_ready(&self, page: &Page) {
        // Uses document.readyState instead of a fixed timeout
        let wait_for_ready_script = r#"
            new Promise((resolve) => {
                if (document.readyState === 'complete' || document.readyState === 'interactive') {
                    resolve(document.readyState);
                } else {
                    document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
                    // Fallback timeout in case event never fires
                    setTimeout(() => resolve('timeout'), 10000);
                }
            })
        "#;

        let ready_timeout = Duration::from_secs(self.settings.load_timeout_secs);
        match tokio::time::timeout(
            ready_timeout,
            page.evaluate(wait_for_ready_script.to_string()),
        )
        .await
        {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => {
                debug!("Could not check ready state: {}", e);
            }
            Err(_) => {
                warn!("Timeout waiting for page ready state");
            }
        }
    }

    async fn scroll_to_bottom(&self, page: &Page) -> Result<i64, GrabError> {
        let script = "(() => { window.scrollTo(0, document.body.scrollHeight); \
             return document.body.scrollHeight; })()";
        let result = page
            .evaluate(script.to_string())
            .await
            .map_err(|e| GrabError::Browser(e.to_string()))?;
        result
            .into_value::<i64>()
            .map_err(|e| GrabError::Browser(format!("scroll height: {}", e)))
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
impl CaptureStrategy {
    pub fn new(settings: CaptureSettings, formats: Vec<String>) -> Self {
        Self { settings, formats }
    }

    pub async fn capture(
        &self,
        _page_url: &Url,
        _max_results: usize,
        _progress: Option<mpsc::Sender<CaptureProgress>>,
    ) -> Result<Vec<CaptureRecord>, GrabError> {
        let _ = &self.settings;
        Err(GrabError::Browser(
            "browser support not compiled; rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}
