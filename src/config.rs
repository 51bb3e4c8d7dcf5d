//! Run settings and environment-sourced credentials.

use serde::{Deserialize, Serialize};

/// Environment variable holding the Giphy API key.
pub const GIPHY_API_KEY_VAR: &str = "GIPHY_API_KEY";

/// Environment variable holding the Tenor API key.
pub const TENOR_API_KEY_VAR: &str = "TENOR_API_KEY";

/// Settings for one resolution/download run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Accepted file extensions. The accepted set is configuration, not
    /// protocol: adding a format here extends every strategy and the
    /// executor's content-type check.
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,

    /// Hard cap on files downloaded per run, applied after discovery.
    #[serde(default = "default_max_downloads")]
    pub max_downloads: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Fixed delay after each request in milliseconds.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Live browser capture options.
    #[serde(default)]
    pub capture: CaptureSettings,
}

/// Options for the live capture strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Whether the capture fallback may run at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Wall-clock seconds to keep listening after page load.
    #[serde(default = "default_capture_window")]
    pub window_secs: u64,

    /// Page load timeout in seconds; expiry is non-fatal.
    #[serde(default = "default_load_timeout")]
    pub load_timeout_secs: u64,

    /// Bounded number of scroll-to-bottom steps (0 disables scrolling).
    #[serde(default)]
    pub scroll_steps: usize,

    /// Fixed wait after each scroll step in milliseconds.
    #[serde(default = "default_scroll_delay")]
    pub scroll_delay_ms: u64,

    /// Run the browser headless (disable for debugging).
    #[serde(default = "default_enabled")]
    pub headless: bool,
}

fn default_formats() -> Vec<String> {
    vec!["webp".to_string(), "gif".to_string()]
}

fn default_max_downloads() -> usize {
    100
}

fn default_request_timeout() -> u64 {
    20
}

fn default_request_delay() -> u64 {
    0
}

fn default_enabled() -> bool {
    true
}

fn default_capture_window() -> u64 {
    8
}

fn default_load_timeout() -> u64 {
    20
}

fn default_scroll_delay() -> u64 {
    700
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            formats: default_formats(),
            max_downloads: default_max_downloads(),
            request_timeout_secs: default_request_timeout(),
            request_delay_ms: default_request_delay(),
            capture: CaptureSettings::default(),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            window_secs: default_capture_window(),
            load_timeout_secs: default_load_timeout(),
            scroll_steps: 0,
            scroll_delay_ms: default_scroll_delay(),
            headless: default_enabled(),
        }
    }
}

/// Read an API key from the environment, treating empty values as absent.
pub fn api_key(var: &'static str) -> Option<String> {
    std::env::var(var).ok().filter(|k| !k.trim().is_empty())
}
