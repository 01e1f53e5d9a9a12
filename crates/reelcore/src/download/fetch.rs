//! Media retrieval through yt-dlp
//!
//! The fetcher downloads a single item into the workspace `media/` directory
//! and reports the resulting file plus the declared title. yt-dlp is asked to
//! print its info JSON after downloading (`--dump-single-json --no-simulate`),
//! which gives the final path without a second metadata call. When that path
//! is missing (merge renamed it, template mismatch) the directory is scanned.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use url::Url;

use crate::core::config::{self, Config};
use crate::core::error::{AppError, AppResult};
use crate::core::process::{run_with_timeout, stderr_tail};
use crate::download::error::DownloadError;
use crate::download::ytdlp_errors::{analyze_ytdlp_error, get_error_message, needs_operator_attention};

/// Per-request extractor options
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub user_agent: String,
    pub referer: Option<String>,
    /// Netscape cookie jar inside the workspace
    pub cookie_jar: Option<PathBuf>,
    pub geo_bypass: bool,
}

impl FetchOptions {
    pub fn from_config(config: &Config, cookie_jar: Option<PathBuf>) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            referer: config.referer.clone(),
            cookie_jar,
            geo_bypass: config.geo_bypass,
        }
    }
}

/// A retrieved media file and its declared title
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub path: PathBuf,
    pub title: String,
}

/// Retrieves one media item into a directory.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Human-readable backend name (e.g. "yt-dlp")
    fn name(&self) -> &str;

    /// Downloads `url` into `media_dir`.
    async fn fetch(&self, url: &Url, media_dir: &Path, options: &FetchOptions) -> AppResult<FetchResult>;
}

/// yt-dlp backed fetcher
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    bin: String,
    timeout: Duration,
}

impl YtDlpFetcher {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ytdl_bin.clone(), config.fetch_timeout)
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn fetch(&self, url: &Url, media_dir: &Path, options: &FetchOptions) -> AppResult<FetchResult> {
        let args = build_fetch_args(url, media_dir, options);
        log::debug!("yt-dlp command: {} {}", self.bin, args.join(" "));

        let output = match run_with_timeout(Command::new(&self.bin).args(&args), self.timeout).await {
            Ok(output) => output,
            Err(AppError::Io(e)) => {
                log::error!("❌ Failed to start {}: {}", self.bin, e);
                return Err(DownloadError::Process(format!("Failed to start {}: {}", self.bin, e)).into());
            }
            Err(e) => {
                log::error!("❌ yt-dlp did not finish in {}s for {}", self.timeout.as_secs(), url);
                return Err(e);
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let error_type = analyze_ytdlp_error(&stderr);
            log::error!(
                "❌ yt-dlp failed for {}: {:?} (exit {:?})\n{}",
                url,
                error_type,
                output.status.code(),
                stderr_tail(&output, 5)
            );
            if needs_operator_attention(error_type) {
                log::warn!("🍪 Check the cookie configuration and the yt-dlp version");
            }
            return Err(DownloadError::FetchFailed(get_error_message(error_type).to_string()).into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let info = parse_info_json(&stdout);
        if info.is_none() {
            log::warn!("yt-dlp printed no usable info JSON for {}", url);
        }
        let info = info.unwrap_or_default();

        let path = locate_output(info.predicted_path().as_deref(), media_dir).await?;
        let title = resolve_title(info.title.as_deref());
        log::info!("📥 Fetched \"{}\" -> {}", title, path.display());

        Ok(FetchResult { path, title })
    }
}

/// Builds the yt-dlp argument list for one download.
pub fn build_fetch_args(url: &Url, media_dir: &Path, options: &FetchOptions) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--no-playlist".into(),
        "-f".into(),
        config::download::FORMAT_SELECTOR.into(),
        "--merge-output-format".into(),
        config::download::MERGE_OUTPUT_FORMAT.into(),
        "--user-agent".into(),
        options.user_agent.clone(),
    ];

    if let Some(referer) = &options.referer {
        args.push("--referer".into());
        args.push(referer.clone());
    }
    if let Some(jar) = &options.cookie_jar {
        args.push("--cookies".into());
        args.push(jar.to_string_lossy().into_owned());
    }
    if options.geo_bypass {
        args.push("--geo-bypass".into());
    }

    args.push("-o".into());
    args.push(media_dir.join(config::download::OUTPUT_TEMPLATE).to_string_lossy().into_owned());
    args.push("--dump-single-json".into());
    args.push("--no-simulate".into());
    args.push(url.as_str().to_string());
    args
}

/// The subset of yt-dlp's info JSON the fetcher needs
#[derive(Debug, Default, Deserialize)]
pub struct InfoJson {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "_filename")]
    pub underscore_filename: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub requested_downloads: Vec<RequestedDownload>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequestedDownload {
    #[serde(default)]
    pub filepath: Option<String>,
}

impl InfoJson {
    /// Final path after merging, falling back to the pre-merge prediction
    pub fn predicted_path(&self) -> Option<PathBuf> {
        self.requested_downloads
            .iter()
            .find_map(|d| d.filepath.clone())
            .or_else(|| self.underscore_filename.clone())
            .or_else(|| self.filename.clone())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }
}

/// Parses the info JSON yt-dlp prints on stdout (last JSON line wins).
pub fn parse_info_json(stdout: &str) -> Option<InfoJson> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|l| l.starts_with('{'))
        .find_map(|l| serde_json::from_str(l).ok())
}

/// Title to show the user, `video` when missing or blank
pub fn resolve_title(title: Option<&str>) -> String {
    title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(config::download::DEFAULT_TITLE)
        .to_string()
}

fn is_partial_fragment(name: &str) -> bool {
    name.ends_with(".part") || name.ends_with(".ytdl") || name.contains(".part-Frag")
}

/// Returns the downloaded file.
///
/// Uses `predicted` when it names an existing regular file, otherwise takes
/// the first regular file in `media_dir` by name, skipping partial-download
/// fragments.
pub async fn locate_output(predicted: Option<&Path>, media_dir: &Path) -> AppResult<PathBuf> {
    if let Some(path) = predicted {
        if is_regular_file(path).await {
            return Ok(path.to_path_buf());
        }
        log::warn!("File not found at predicted path: {}", path.display());
    }

    let read_error =
        |e: std::io::Error| DownloadError::FetchFailed(format!("Failed to read media dir {}: {}", media_dir.display(), e));
    let mut entries = tokio::fs::read_dir(media_dir).await.map_err(read_error)?;

    let mut candidates: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if is_file && !is_partial_fragment(&entry.file_name().to_string_lossy()) {
            candidates.push(entry.path());
        }
    }
    candidates.sort();

    match candidates.into_iter().next() {
        Some(path) => {
            log::info!("Recovered downloaded file by scan: {}", path.display());
            Ok(path)
        }
        None => Err(DownloadError::FetchFailed("The download produced no file.".to_string()).into()),
    }
}

async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}
