//! Execution services.
//!
//! Separated from UI concerns - emits events for progress tracking.

pub mod download;

pub use download::{DownloadEvent, DownloadService};
