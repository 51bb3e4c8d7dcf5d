//! Download executor.
//!
//! Walks resolved targets sequentially, trying each target's candidate URLs
//! in preference order and saving the first acceptable response under a
//! collision-probed filename. One target failing never aborts the run.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

use crate::error::GrabError;
use crate::fetch::HttpClient;
use crate::models::{DownloadOutcome, RunContext, RunSummary, Target};
use crate::utils::{formats, naming};

/// Events emitted during download operations.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// Download started for a target.
    Started {
        index: usize,
        total: usize,
        url: String,
    },
    /// Target saved to disk.
    Saved {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    /// All candidates for a target failed.
    Failed {
        index: usize,
        total: usize,
        url: String,
        error: String,
    },
}

/// Service for downloading resolved targets.
pub struct DownloadService {
    client: HttpClient,
    formats: Vec<String>,
}

impl DownloadService {
    pub fn new(client: HttpClient, formats: Vec<String>) -> Self {
        Self { client, formats }
    }

    /// Download targets into the run's output directory.
    ///
    /// Targets are processed in order, capped at `ctx.max_downloads`.
    /// Filename probing relies on sequential execution: each saved file is
    /// on disk before the next name is resolved.
    pub async fn download_all(
        &self,
        targets: &[Target],
        ctx: &RunContext,
        event_tx: mpsc::Sender<DownloadEvent>,
    ) -> Result<RunSummary, GrabError> {
        let batch = &targets[..targets.len().min(ctx.max_downloads)];
        let total = batch.len();
        let mut summary = RunSummary::default();

        for (i, target) in batch.iter().enumerate() {
            let index = i + 1;
            let primary = target.candidates()[0].to_string();
            let _ = event_tx
                .send(DownloadEvent::Started {
                    index,
                    total,
                    url: primary.clone(),
                })
                .await;

            match self.download_target(target, ctx, index).await {
                DownloadOutcome::Saved(path) => {
                    summary.ok_count += 1;
                    let _ = event_tx.send(DownloadEvent::Saved { index, total, path }).await;
                }
                DownloadOutcome::Failed(error) => {
                    summary.fail_count += 1;
                    let _ = event_tx
                        .send(DownloadEvent::Failed {
                            index,
                            total,
                            url: primary,
                            error: error.to_string(),
                        })
                        .await;
                }
            }
        }

        Ok(summary)
    }

    /// Try a target's candidates in order; first acceptable response wins.
    async fn download_target(
        &self,
        target: &Target,
        ctx: &RunContext,
        fallback_index: usize,
    ) -> DownloadOutcome {
        let mut last_error: Option<GrabError> = None;

        for candidate in target.candidates() {
            match self.fetch_candidate(candidate).await {
                Ok((bytes, content_type)) => {
                    let filename = naming::resolve_filename(
                        candidate,
                        content_type.as_deref(),
                        target.name_hint.as_deref(),
                        fallback_index,
                        &self.formats,
                    );
                    match self.save(&ctx.output_dir, &filename, &bytes).await {
                        Ok(path) => return DownloadOutcome::Saved(path),
                        // A filesystem failure will not improve on the
                        // next candidate; report it for this target.
                        Err(e) => return DownloadOutcome::Failed(e),
                    }
                }
                Err(e) => {
                    debug!("candidate {} failed: {}", candidate, e);
                    last_error = Some(e);
                }
            }
        }

        let error = last_error.unwrap_or_else(|| {
            GrabError::Parse("target carried no usable candidates".to_string())
        });
        DownloadOutcome::Failed(error)
    }

    /// Fetch one candidate, enforcing status and format acceptance.
    async fn fetch_candidate(
        &self,
        candidate: &Url,
    ) -> Result<(Vec<u8>, Option<String>), GrabError> {
        let response = self.client.get(candidate.as_str()).await?;
        if !response.is_success() {
            return Err(GrabError::Status {
                url: candidate.to_string(),
                status: response.status,
            });
        }

        let content_type = response.content_type().map(|s| s.to_string());
        let mime_ok = content_type
            .as_deref()
            .is_some_and(|ct| formats::is_accepted_mime(ct, &self.formats));
        let path_ok = formats::is_accepted_path(candidate.path(), &self.formats);
        if !mime_ok && !path_ok {
            return Err(GrabError::FormatMismatch {
                url: candidate.to_string(),
                content_type: content_type.unwrap_or_else(|| "unknown".to_string()),
            });
        }

        let bytes = response.bytes().await?;
        Ok((bytes, content_type))
    }

    /// Write bytes under a collision-probed name, staging through a `.part`
    /// file so an interrupted write never leaves a truncated final file.
    async fn save(&self, dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, GrabError> {
        tokio::fs::create_dir_all(dir).await?;

        let path = naming::unique_path(dir, filename);
        let staging = path.with_extension(match path.extension() {
            Some(ext) => format!("{}.part", ext.to_string_lossy()),
            None => "part".to_string(),
        });

        if let Err(e) = tokio::fs::write(&staging, bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            warn!("rename of staged download failed: {}", e);
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }

        Ok(path)
    }
}
