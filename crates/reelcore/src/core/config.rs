use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::core::error::{AppError, AppResult};
use crate::download::cookies::CookieSources;

/// Upload size limits
pub mod upload {
    /// Default maximum upload size in megabytes
    pub const DEFAULT_MAX_UPLOAD_MB: u64 = 100;

    /// Bytes per megabyte used for the size ceiling
    pub const BYTES_PER_MB: u64 = 1024 * 1024;
}

/// Queue processing configuration
pub mod queue {
    /// Maximum number of pipelines running at the same time
    pub const MAX_CONCURRENT_DOWNLOADS: usize = 2;

    /// Maximum number of requests pending or running before new ones are refused
    pub const MAX_QUEUE_SIZE: usize = 1000;

    /// Grace period for in-flight requests when the bot shuts down (in seconds)
    pub const SHUTDOWN_GRACE_SECS: u64 = 15;
}

/// Download configuration
pub mod download {
    /// Timeout for yt-dlp commands (in seconds)
    pub const YTDLP_TIMEOUT_SECS: u64 = 240;

    /// Identity sent to sites by yt-dlp
    pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

    /// Format selection: best video + best audio, else best combined stream
    pub const FORMAT_SELECTOR: &str = "bv*+ba/best";

    /// Container the extractor merges separate streams into
    pub const MERGE_OUTPUT_FORMAT: &str = "mp4";

    /// Output template relative to the workspace media directory
    pub const OUTPUT_TEMPLATE: &str = "%(title).80s_%(id)s.%(ext)s";

    /// Title used when the extractor supplies none
    pub const DEFAULT_TITLE: &str = "video";

    /// Overall timeout for fetching cookie material from COOKIES_URL (in seconds)
    pub const COOKIES_TIMEOUT_SECS: u64 = 30;

    /// Connect timeout for the cookie link (in seconds)
    pub const COOKIES_CONNECT_TIMEOUT_SECS: u64 = 10;
}

/// Transcoding configuration
pub mod transcode {
    /// Timeout for a single ffmpeg run (in seconds)
    pub const FFMPEG_TIMEOUT_SECS: u64 = 600;

    /// Timeout for ffprobe metadata queries (in seconds)
    pub const FFPROBE_TIMEOUT_SECS: u64 = 30;

    /// Video codec that needs no re-encode
    pub const TARGET_VIDEO_CODEC: &str = "h264";

    /// Audio codec that needs no re-encode
    pub const TARGET_AUDIO_CODEC: &str = "aac";

    /// Frame rates outside [MIN_FPS, MAX_FPS] are treated as unreliable
    pub const MIN_FPS: f64 = 15.0;
    pub const MAX_FPS: f64 = 61.0;

    /// Canonical frame rate forced during re-encode
    pub const OUTPUT_FPS: u32 = 30;

    /// x264 constant rate factor
    pub const CRF: u8 = 18;

    /// x264 preset
    pub const PRESET: &str = "medium";

    /// Maximum number of frames between keyframes
    pub const KEYFRAME_INTERVAL: u32 = 60;

    /// AAC bitrate
    pub const AUDIO_BITRATE: &str = "192k";

    /// Extension of every transcoded artifact
    pub const OUTPUT_EXTENSION: &str = "mp4";
}

/// Runtime configuration shared by every request.
///
/// Built once at startup and passed explicitly into the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upload ceiling in megabytes (MAX_UPLOAD_MB)
    pub max_upload_mb: u64,
    /// Parent directory for per-request workspaces (TEMP_FILES_DIR)
    pub temp_dir: PathBuf,
    /// yt-dlp binary (YTDL_BIN)
    pub ytdl_bin: String,
    /// ffmpeg binary (FFMPEG_BIN)
    pub ffmpeg_bin: String,
    /// ffprobe binary (FFPROBE_BIN)
    pub ffprobe_bin: String,
    /// User-Agent handed to yt-dlp (YTDL_USER_AGENT)
    pub user_agent: String,
    /// Optional referer handed to yt-dlp (YTDL_REFERER)
    pub referer: Option<String>,
    /// Pass --geo-bypass to yt-dlp (YTDL_GEO_BYPASS)
    pub geo_bypass: bool,
    /// Cookie material sources (COOKIES_URL, COOKIES_B64, COOKIES_TXT)
    pub cookies: CookieSources,
    /// Pipelines allowed to run at once (MAX_CONCURRENT_DOWNLOADS)
    pub max_concurrent_downloads: usize,
    /// Pending + running requests allowed (MAX_QUEUE_SIZE)
    pub max_queue_size: usize,
    /// Fetch timeout (FETCH_TIMEOUT_SECS)
    pub fetch_timeout: Duration,
    /// Transcode timeout (TRANSCODE_TIMEOUT_SECS)
    pub transcode_timeout: Duration,
    /// Probe timeout
    pub probe_timeout: Duration,
    /// Cookie link request timeout (COOKIES_TIMEOUT_SECS)
    pub cookies_timeout: Duration,
    /// Log file path (LOG_FILE_PATH)
    pub log_file_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_upload_mb: upload::DEFAULT_MAX_UPLOAD_MB,
            temp_dir: env::temp_dir(),
            ytdl_bin: "yt-dlp".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            user_agent: download::DEFAULT_USER_AGENT.to_string(),
            referer: None,
            geo_bypass: true,
            cookies: CookieSources::default(),
            max_concurrent_downloads: queue::MAX_CONCURRENT_DOWNLOADS,
            max_queue_size: queue::MAX_QUEUE_SIZE,
            fetch_timeout: Duration::from_secs(download::YTDLP_TIMEOUT_SECS),
            transcode_timeout: Duration::from_secs(transcode::FFMPEG_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(transcode::FFPROBE_TIMEOUT_SECS),
            cookies_timeout: Duration::from_secs(download::COOKIES_TIMEOUT_SECS),
            log_file_path: "reelbot.log".to_string(),
        }
    }
}

impl Config {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset. Numeric values that fail to parse are
    /// reported as [`AppError::Config`] instead of silently falling back.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let max_concurrent_downloads = parse_or(&get, "MAX_CONCURRENT_DOWNLOADS", defaults.max_concurrent_downloads)?;
        if max_concurrent_downloads == 0 {
            return Err(AppError::Config("MAX_CONCURRENT_DOWNLOADS must be at least 1".to_string()));
        }

        let temp_dir = get("TEMP_FILES_DIR")
            .map(|dir| PathBuf::from(shellexpand::tilde(&dir).to_string()))
            .unwrap_or(defaults.temp_dir);

        Ok(Self {
            max_upload_mb: parse_or(&get, "MAX_UPLOAD_MB", defaults.max_upload_mb)?,
            temp_dir,
            ytdl_bin: get("YTDL_BIN").unwrap_or(defaults.ytdl_bin),
            ffmpeg_bin: get("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: get("FFPROBE_BIN").unwrap_or(defaults.ffprobe_bin),
            user_agent: get("YTDL_USER_AGENT").unwrap_or(defaults.user_agent),
            referer: get("YTDL_REFERER"),
            geo_bypass: parse_flag(&get, "YTDL_GEO_BYPASS", defaults.geo_bypass)?,
            cookies: CookieSources {
                url: get("COOKIES_URL"),
                base64: get("COOKIES_B64"),
                raw: get("COOKIES_TXT"),
            },
            max_concurrent_downloads,
            max_queue_size: parse_or(&get, "MAX_QUEUE_SIZE", defaults.max_queue_size)?,
            fetch_timeout: Duration::from_secs(parse_or(&get, "FETCH_TIMEOUT_SECS", download::YTDLP_TIMEOUT_SECS)?),
            transcode_timeout: Duration::from_secs(parse_or(
                &get,
                "TRANSCODE_TIMEOUT_SECS",
                transcode::FFMPEG_TIMEOUT_SECS,
            )?),
            probe_timeout: defaults.probe_timeout,
            cookies_timeout: Duration::from_secs(parse_or(
                &get,
                "COOKIES_TIMEOUT_SECS",
                download::COOKIES_TIMEOUT_SECS,
            )?),
            log_file_path: get("LOG_FILE_PATH").unwrap_or(defaults.log_file_path),
        })
    }

    /// Upload ceiling in bytes
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(upload::BYTES_PER_MB)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {:?}", key, raw))),
        None => Ok(default),
    }
}

fn parse_flag<G>(get: &G, key: &str, default: bool) -> AppResult<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(AppError::Config(format!("{} has an invalid value: {:?}", key, v))),
    }
}
