//! CLI entry point: argument parsing and run orchestration.
//!
//! Business logic lives in the pipeline and download service; this module
//! only wires them together and renders progress.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use url::Url;

use crate::config::Settings;
use crate::fetch::HttpClient;
use crate::models::RunContext;
use crate::services::{DownloadEvent, DownloadService};
use crate::strategies::{CaptureProgress, Pipeline, ResolvedVia};

#[derive(Parser)]
#[command(name = "gifgrab")]
#[command(about = "Download animated media referenced by a web page")]
#[command(version)]
pub struct Cli {
    /// Page URL to resolve (site search page, gallery, or any page)
    url: String,

    /// Maximum number of files to download
    #[arg(short, long, default_value = "100")]
    limit: usize,

    /// Accepted file formats, comma-separated (default: webp,gif)
    #[arg(short, long)]
    formats: Option<String>,

    /// Output directory (default: downloads_<host>_<timestamp> under the CWD)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Disable the live browser capture fallback
    #[arg(long)]
    no_capture: bool,

    /// Seconds to keep capturing network responses after page load
    #[arg(long, default_value = "8")]
    capture_window: u64,

    /// Scroll-to-bottom steps during capture (0 disables scrolling)
    #[arg(long, default_value = "0")]
    scroll: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

fn settings_from(cli: &Cli) -> Settings {
    let mut settings = Settings::default();
    settings.max_downloads = cli.limit.max(1);
    if let Some(ref formats) = cli.formats {
        let parsed: Vec<String> = formats
            .split(',')
            .map(|f| f.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        if !parsed.is_empty() {
            settings.formats = parsed;
        }
    }
    settings.capture.enabled = !cli.no_capture;
    settings.capture.window_secs = cli.capture_window;
    settings.capture.scroll_steps = cli.scroll;
    settings
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let page_url = Url::parse(cli.url.trim())
        .map_err(|e| anyhow::anyhow!("invalid page URL {:?}: {}", cli.url, e))?;
    let settings = settings_from(&cli);

    let mut ctx = RunContext::new(page_url.clone(), settings.max_downloads);
    if let Some(out) = cli.out.clone() {
        ctx = ctx.with_output_dir(out);
    }

    let client = HttpClient::new(
        Duration::from_secs(settings.request_timeout_secs),
        Duration::from_millis(settings.request_delay_ms),
    );
    let pipeline = Pipeline::new(client.clone(), &settings);

    println!("{} Resolving {}", style("→").cyan(), page_url);

    // Spinner fed by the capture strategy's incremental counter; idle for
    // API/scan resolution, which is a single request.
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("valid spinner template"),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message("searching for media...");

    let (progress_tx, mut progress_rx) = mpsc::channel::<CaptureProgress>(32);
    let spinner_clone = spinner.clone();
    let progress_task = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            spinner_clone.set_message(format!("captured {} responses...", progress.captured));
        }
    });

    let outcome = pipeline
        .resolve(&page_url, settings.max_downloads, Some(progress_tx))
        .await;
    let _ = progress_task.await;
    spinner.finish_and_clear();

    if let Some(ref notice) = outcome.notice {
        println!("{} {}", style("!").yellow(), notice);
    }
    if outcome.targets.is_empty() {
        println!("{} No media found for this page", style("!").yellow());
        return Ok(());
    }

    let via = match outcome.via {
        ResolvedVia::Site(name) => name,
        ResolvedVia::Scan => "page scan",
        ResolvedVia::Capture => "live capture",
        ResolvedVia::Nothing => unreachable!("targets imply a resolving strategy"),
    };
    println!(
        "{} Found {} targets via {}",
        style("→").cyan(),
        outcome.targets.len(),
        via
    );
    println!(
        "{} Saving to {}",
        style("→").dim(),
        ctx.output_dir.display()
    );

    // Downloads carry the page as referer; CDNs commonly require it.
    let download_client = client.with_referer(ctx.referer().to_string());
    let service = DownloadService::new(download_client, settings.formats.clone());

    let (event_tx, mut event_rx) = mpsc::channel::<DownloadEvent>(100);
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                DownloadEvent::Started { .. } => {}
                DownloadEvent::Saved { index, total, path } => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    println!("[{}/{}] {} {}", index, total, style("✓").green(), name);
                }
                DownloadEvent::Failed {
                    index,
                    total,
                    url,
                    error,
                } => {
                    println!(
                        "[{}/{}] {} {}: {}",
                        index,
                        total,
                        style("✗").red(),
                        url,
                        error
                    );
                }
            }
        }
    });

    let summary = service.download_all(&outcome.targets, &ctx, event_tx).await?;
    let _ = printer.await;

    println!(
        "{} Saved {} files to {}",
        style("✓").green(),
        summary.ok_count,
        ctx.output_dir.display()
    );
    if summary.fail_count > 0 {
        println!("  {} {} targets failed", style("!").yellow(), summary.fail_count);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_flag_is_normalized() {
        let cli = Cli::parse_from([
            "gifgrab",
            "https://example.com",
            "--formats",
            ".WebP, gif,",
        ]);
        let settings = settings_from(&cli);
        assert_eq!(settings.formats, vec!["webp", "gif"]);
    }

    #[test]
    fn capture_flags_map_to_settings() {
        let cli = Cli::parse_from([
            "gifgrab",
            "https://example.com",
            "--no-capture",
            "--scroll",
            "3",
            "--limit",
            "10",
        ]);
        let settings = settings_from(&cli);
        assert!(!settings.capture.enabled);
        assert_eq!(settings.capture.scroll_steps, 3);
        assert_eq!(settings.max_downloads, 10);
    }
}
