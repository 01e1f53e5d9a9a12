//! Logging initialization and configuration checking
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Cookie source diagnostics at startup
//! - External tool availability report

use anyhow::Result;
use simplelog::{ColorChoice, CombinedLogger, LevelFilter, TermLogger, TerminalMode, WriteLogger};
use std::fs::File;

use crate::core::config::Config;
use crate::core::process::is_tool_available;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger was already installed
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            simplelog::Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, simplelog::Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs which cookie source will be used for sites that need a session.
///
/// Sources are consulted in priority order: link, base64 blob, raw text.
/// Only the winning source is reported; the material itself is never logged.
pub fn log_cookies_configuration(config: &Config) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🍪 Cookies Configuration Check");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let cookies = &config.cookies;
    match cookies.active_source() {
        Some(source) => {
            log::info!("✅ Cookie source: {}", source);
            if cookies.configured_count() > 1 {
                log::warn!(
                    "⚠️  {} cookie sources configured, only {} will be used",
                    cookies.configured_count(),
                    source
                );
            }
        }
        None => {
            log::warn!("⚠️  No cookies configured (COOKIES_URL / COOKIES_B64 / COOKIES_TXT)");
            log::warn!("   Sites that require a logged-in session will fail to download");
        }
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Availability of the external tools the pipeline shells out to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolReport {
    pub ytdlp: bool,
    pub ffmpeg: bool,
    pub ffprobe: bool,
}

/// Probes yt-dlp, ffmpeg and ffprobe and logs the result.
///
/// Missing ffmpeg/ffprobe only degrade normalization; a missing yt-dlp
/// makes every request fail, so it is logged as an error.
pub async fn log_tools_availability(config: &Config) -> ToolReport {
    let report = ToolReport {
        ytdlp: is_tool_available(&config.ytdl_bin, "--version").await,
        ffmpeg: is_tool_available(&config.ffmpeg_bin, "-version").await,
        ffprobe: is_tool_available(&config.ffprobe_bin, "-version").await,
    };

    if report.ytdlp {
        log::info!("✅ yt-dlp: {}", config.ytdl_bin);
    } else {
        log::error!("❌ yt-dlp not found ({}), downloads will FAIL", config.ytdl_bin);
    }
    if report.ffmpeg {
        log::info!("✅ ffmpeg: {}", config.ffmpeg_bin);
    } else {
        log::warn!("⚠️  ffmpeg not found ({}), videos will be sent unconverted", config.ffmpeg_bin);
    }
    if report.ffprobe {
        log::info!("✅ ffprobe: {}", config.ffprobe_bin);
    } else {
        log::warn!("⚠️  ffprobe not found ({}), every video will be re-encoded", config.ffprobe_bin);
    }

    report
}
