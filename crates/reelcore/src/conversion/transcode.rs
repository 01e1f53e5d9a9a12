//! ffmpeg invocations
//!
//! Two profiles:
//! - Remux: even dimensions, streams copied, `+faststart`
//! - Reencode: even dimensions, 30 fps, H.264 (CRF 18, fixed GOP) + AAC 192k
//!
//! Outputs always go to the workspace root, never next to the source.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use super::{ConversionError, ConversionResult};
use crate::core::config::{transcode, Config};
use crate::core::error::AppError;
use crate::core::process::{is_tool_available, run_with_timeout, stderr_tail};

/// Scale filter rounding both dimensions down to even numbers (required by yuv420p)
const EVEN_DIMENSIONS_FILTER: &str = "scale=trunc(iw/2)*2:trunc(ih/2)*2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeProfile {
    /// Container rewrite, streams copied
    Remux,
    /// Full H.264/AAC encode
    Reencode,
}

impl TranscodeProfile {
    /// File name of the artifact in the workspace root
    pub fn output_name(&self) -> &'static str {
        match self {
            TranscodeProfile::Remux => "remuxed.mp4",
            TranscodeProfile::Reencode => "reencoded.mp4",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TranscodeProfile::Remux => "remux",
            TranscodeProfile::Reencode => "reencode",
        }
    }

    /// Arguments between the input and the output
    pub fn codec_args(&self) -> Vec<String> {
        match self {
            TranscodeProfile::Remux => vec![
                "-vf".into(),
                EVEN_DIMENSIONS_FILTER.into(),
                "-c:v".into(),
                "copy".into(),
                "-c:a".into(),
                "copy".into(),
                "-movflags".into(),
                "+faststart".into(),
            ],
            TranscodeProfile::Reencode => vec![
                "-vf".into(),
                format!("{},fps={}", EVEN_DIMENSIONS_FILTER, transcode::OUTPUT_FPS),
                "-c:v".into(),
                "libx264".into(),
                "-preset".into(),
                transcode::PRESET.into(),
                "-crf".into(),
                transcode::CRF.to_string(),
                "-pix_fmt".into(),
                "yuv420p".into(),
                "-g".into(),
                transcode::KEYFRAME_INTERVAL.to_string(),
                "-keyint_min".into(),
                transcode::KEYFRAME_INTERVAL.to_string(),
                "-sc_threshold".into(),
                "0".into(),
                "-c:a".into(),
                "aac".into(),
                "-b:a".into(),
                transcode::AUDIO_BITRATE.into(),
                "-movflags".into(),
                "+faststart".into(),
            ],
        }
    }
}

/// Full ffmpeg argument list for one run
pub fn build_ffmpeg_args(profile: TranscodeProfile, input: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-loglevel".into(), "error".into(), "-y".into()];
    args.push("-i".into());
    args.push(input.as_os_str().to_os_string());
    args.extend(profile.codec_args().into_iter().map(OsString::from));
    args.push(output.as_os_str().to_os_string());
    args
}

/// Runs transcode profiles.
///
/// Implementations report process-level success only; the caller still
/// checks that the output exists and is non-empty.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Whether the transcoder can run at all on this host
    async fn is_available(&self) -> bool;

    async fn transcode(&self, profile: TranscodeProfile, input: &Path, output: &Path) -> ConversionResult<()>;
}

#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    bin: String,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ffmpeg_bin.clone(), config.transcode_timeout)
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn is_available(&self) -> bool {
        is_tool_available(&self.bin, "-version").await
    }

    async fn transcode(&self, profile: TranscodeProfile, input: &Path, output: &Path) -> ConversionResult<()> {
        if !input.exists() {
            return Err(ConversionError::InputNotFound(input.display().to_string()));
        }

        let mut cmd = Command::new(&self.bin);
        cmd.args(build_ffmpeg_args(profile, input, output));

        let result = match run_with_timeout(&mut cmd, self.timeout).await {
            Ok(result) => result,
            Err(AppError::Io(e)) => return Err(ConversionError::IoError(e)),
            Err(_) => return Err(ConversionError::Timeout(self.timeout.as_secs())),
        };

        if !result.status.success() {
            return Err(ConversionError::FfmpegError(format!(
                "{} exited with {:?}: {}",
                profile.label(),
                result.status.code(),
                stderr_tail(&result, 5)
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn joined(args: &[OsString]) -> String {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_remux_args() {
        let args = build_ffmpeg_args(TranscodeProfile::Remux, Path::new("/ws/media/in.webm"), Path::new("/ws/remuxed.mp4"));
        assert_eq!(
            joined(&args),
            "-hide_banner -loglevel error -y -i /ws/media/in.webm -vf scale=trunc(iw/2)*2:trunc(ih/2)*2 \
             -c:v copy -c:a copy -movflags +faststart /ws/remuxed.mp4"
        );
    }

    #[test]
    fn test_reencode_args() {
        let args = build_ffmpeg_args(
            TranscodeProfile::Reencode,
            Path::new("/ws/media/in.webm"),
            Path::new("/ws/reencoded.mp4"),
        );
        assert_eq!(
            joined(&args),
            "-hide_banner -loglevel error -y -i /ws/media/in.webm -vf scale=trunc(iw/2)*2:trunc(ih/2)*2,fps=30 \
             -c:v libx264 -preset medium -crf 18 -pix_fmt yuv420p -g 60 -keyint_min 60 -sc_threshold 0 \
             -c:a aac -b:a 192k -movflags +faststart /ws/reencoded.mp4"
        );
    }

    #[test]
    fn test_output_names_differ() {
        assert_eq!(TranscodeProfile::Remux.output_name(), "remuxed.mp4");
        assert_eq!(TranscodeProfile::Reencode.output_name(), "reencoded.mp4");
    }

    #[tokio::test]
    async fn test_missing_ffmpeg() {
        let transcoder = FfmpegTranscoder::new("reel-missing-ffmpeg", Duration::from_secs(5));
        assert!(!transcoder.is_available().await);

        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"x").unwrap();
        let err = transcoder
            .transcode(TranscodeProfile::Remux, &input, &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::IoError(_)));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let transcoder = FfmpegTranscoder::new("ffmpeg", Duration::from_secs(5));
        let err = transcoder
            .transcode(TranscodeProfile::Remux, Path::new("/nonexistent/in.mp4"), Path::new("/tmp/out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::InputNotFound(_)));
    }
}
