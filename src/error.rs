//! Error types for resolution and download operations.

/// Error type shared by strategies and the download executor.
///
/// Per-candidate and per-target errors are recorded, never raised past the
/// executor; strategy-level errors downgrade to an empty claim in the
/// pipeline. Only setup failures (bad input URL, unusable output directory)
/// surface to the caller.
#[derive(Debug, thiserror::Error)]
pub enum GrabError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("missing credential: set the {0} environment variable")]
    CredentialMissing(&'static str),

    #[error("{url} does not match an accepted format (content-type {content_type:?})")]
    FormatMismatch { url: String, content_type: String },

    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("browser capture failed: {0}")]
    Browser(String),
}
