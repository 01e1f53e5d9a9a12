//! Request pipeline orchestrator.
//!
//! One request runs start to finish inside its own workspace:
//!   cookies → fetch → verify file → normalize → size gate → read bytes
//!   → deliver (or notify) → release workspace
//!
//! Every exit path releases the workspace; task aborts and panics are covered
//! by the workspace `Drop` guard. All per-request errors end here and are
//! reported to the requester through [`notify_best_effort`].

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use crate::conversion::normalize::Normalizer;
use crate::conversion::probe::{FfprobeInspector, MediaInspector};
use crate::conversion::transcode::{FfmpegTranscoder, Transcoder};
use crate::core::config::Config;
use crate::core::error::{AppError, AppResult};
use crate::core::utils::format_megabytes;
use crate::download::cookies::cookie_http_client;
use crate::download::error::DownloadError;
use crate::download::fetch::{FetchOptions, MediaFetcher, YtDlpFetcher};
use crate::download::gate::{DeliveryDecision, DeliveryGate};
use crate::download::send::{
    failure_notice, notify_best_effort, ready_caption, too_large_notice, Courier, MediaAttachment, Requester,
};
use crate::download::workspace::Workspace;

/// A submitted video request. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: Uuid,
    pub url: Url,
    pub requester: Requester,
    pub submitted_at: DateTime<Utc>,
}

impl Request {
    pub fn new(url: Url, requester: Requester) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            requester,
            submitted_at: Utc::now(),
        }
    }

    /// Short id used as a log prefix
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

/// Everything a pipeline run needs, passed explicitly
#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub inspector: Arc<dyn MediaInspector>,
    pub transcoder: Arc<dyn Transcoder>,
    pub http: reqwest::Client,
}

impl PipelineContext {
    pub fn new(
        config: Config,
        fetcher: Arc<dyn MediaFetcher>,
        inspector: Arc<dyn MediaInspector>,
        transcoder: Arc<dyn Transcoder>,
    ) -> AppResult<Self> {
        let http = cookie_http_client(config.cookies_timeout)?;
        Ok(Self {
            config: Arc::new(config),
            fetcher,
            inspector,
            transcoder,
            http,
        })
    }

    /// Context backed by yt-dlp, ffprobe and ffmpeg
    pub fn from_config(config: Config) -> AppResult<Self> {
        let fetcher = Arc::new(YtDlpFetcher::from_config(&config));
        let inspector = Arc::new(FfprobeInspector::from_config(&config));
        let transcoder = Arc::new(FfmpegTranscoder::from_config(&config));
        Self::new(config, fetcher, inspector, transcoder)
    }
}

/// How a request ended, as observed by the requester
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Delivered { filename: String, size: u64, strategy: &'static str },
    RejectedTooLarge { size: u64, ceiling: u64 },
    Failed(String),
}

/// Result of the in-workspace stages, ready to hand to the courier
enum Prepared {
    Deliver {
        attachment: MediaAttachment,
        caption: String,
        strategy: &'static str,
    },
    TooLarge {
        size: u64,
        ceiling: u64,
    },
}

/// Runs one request end to end and reports the outcome to the requester.
pub async fn handle_request(ctx: &PipelineContext, request: &Request, courier: &dyn Courier) -> RequestOutcome {
    let rid = request.short_id();
    log::info!("🎬 [{}] {} requested {}", rid, request.requester, request.url);

    let workspace = match Workspace::acquire(&ctx.config.temp_dir).await {
        Ok(ws) => ws,
        Err(e) => {
            log::error!("❌ [{}] Failed to create workspace: {}", rid, e);
            return report_failure(courier, request, &e).await;
        }
    };

    let prepared = prepare(ctx, request, &workspace).await;

    let outcome = match prepared {
        Ok(Prepared::Deliver {
            attachment,
            caption,
            strategy,
        }) => {
            let filename = attachment.filename.clone();
            let size = attachment.data.len() as u64;
            match courier.send_media(&request.requester, &caption, attachment).await {
                Ok(()) => {
                    log::info!(
                        "✅ [{}] Delivered {} ({}MB, {}) to {}",
                        rid,
                        filename,
                        format_megabytes(size),
                        strategy,
                        request.requester
                    );
                    RequestOutcome::Delivered {
                        filename,
                        size,
                        strategy,
                    }
                }
                Err(e) => {
                    log::error!("❌ [{}] Delivery to {} failed: {}", rid, request.requester, e);
                    let err: AppError = DownloadError::DeliveryFailed(e.to_string()).into();
                    report_failure(courier, request, &err).await
                }
            }
        }
        Ok(Prepared::TooLarge { size, ceiling }) => {
            log::warn!(
                "⚠️ [{}] Artifact too large: {}MB > {}MB",
                rid,
                format_megabytes(size),
                format_megabytes(ceiling)
            );
            notify_best_effort(courier, &request.requester, &too_large_notice(size, ceiling)).await;
            RequestOutcome::RejectedTooLarge { size, ceiling }
        }
        Err(e) => {
            match &e {
                AppError::Download(de) => log::error!("❌ [{}] Failed ({}): {}", rid, de.subcategory(), de),
                other => log::error!("❌ [{}] Failed: {}", rid, other),
            }
            report_failure(courier, request, &e).await
        }
    };

    workspace.release().await;
    outcome
}

async fn report_failure(courier: &dyn Courier, request: &Request, error: &AppError) -> RequestOutcome {
    let detail = error.user_message();
    notify_best_effort(courier, &request.requester, &failure_notice(&detail)).await;
    RequestOutcome::Failed(detail)
}

async fn prepare(ctx: &PipelineContext, request: &Request, workspace: &Workspace) -> AppResult<Prepared> {
    let rid = request.short_id();

    let cookie_jar = materialize_cookies(ctx, workspace, &rid).await;
    let options = FetchOptions::from_config(&ctx.config, cookie_jar);

    log::info!("⬇️ [{}] Fetching with {}", rid, ctx.fetcher.name());
    let fetched = ctx.fetcher.fetch(&request.url, workspace.media_dir(), &options).await?;
    let is_file = tokio::fs::metadata(&fetched.path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        return Err(DownloadError::FileNotFound(fetched.path.display().to_string()).into());
    }

    let normalized = Normalizer::new(ctx.inspector.as_ref(), ctx.transcoder.as_ref())
        .normalize(&fetched.path, workspace.root())
        .await;
    log::info!("🎞️ [{}] Artifact {}: {}", rid, normalized.label(), normalized.path().display());

    let gate = DeliveryGate::from_config(&ctx.config);
    match gate.check(normalized.path(), &fetched.title).await? {
        DeliveryDecision::RejectTooLarge { size, ceiling } => Ok(Prepared::TooLarge { size, ceiling }),
        DeliveryDecision::Deliver { path, filename, .. } => {
            let data = tokio::fs::read(&path).await?;
            Ok(Prepared::Deliver {
                attachment: MediaAttachment { filename, data },
                caption: ready_caption(&fetched.title),
                strategy: normalized.label(),
            })
        }
    }
}

/// Resolves cookie material and writes it into the workspace.
///
/// Any failure is logged and the request continues without cookies.
async fn materialize_cookies(ctx: &PipelineContext, workspace: &Workspace, rid: &str) -> Option<PathBuf> {
    if ctx.config.cookies.is_empty() {
        return None;
    }

    let text = match ctx.config.cookies.resolve(&ctx.http).await {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("🍪 [{}] Cookie material unusable, continuing without cookies: {}", rid, e);
            return None;
        }
    };

    match workspace.write_cookie_jar(&text).await {
        Ok(path) => Some(path),
        Err(e) => {
            log::warn!("🍪 [{}] Failed to write cookie jar: {}", rid, e);
            None
        }
    }
}
