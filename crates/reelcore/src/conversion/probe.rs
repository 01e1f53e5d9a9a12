//! Stream inspection via ffprobe
//!
//! A probe never fails loudly: a missing tool, a non-zero exit, a timeout or
//! unparsable output all yield `None`, which the decision engine treats as
//! "unknown, re-encode to be safe".

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use crate::core::config::Config;
use crate::core::process::run_with_timeout;

/// The stream facts the decision engine needs
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMetadata {
    /// `codec_name` of the first video stream, empty if there is none
    pub video_codec: String,
    /// `codec_name` of the first audio stream, empty if there is none
    pub audio_codec: String,
    /// Frames per second, 0.0 when unknown
    pub fps: f64,
}

/// Inspects a media file.
#[async_trait]
pub trait MediaInspector: Send + Sync {
    async fn probe(&self, path: &Path) -> Option<StreamMetadata>;
}

#[derive(Debug, Clone)]
pub struct FfprobeInspector {
    bin: String,
    timeout: Duration,
}

impl FfprobeInspector {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ffprobe_bin.clone(), config.probe_timeout)
    }
}

#[async_trait]
impl MediaInspector for FfprobeInspector {
    async fn probe(&self, path: &Path) -> Option<StreamMetadata> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
            .arg(path);

        let output = match run_with_timeout(&mut cmd, self.timeout).await {
            Ok(output) => output,
            Err(e) => {
                log::warn!("ffprobe unavailable for {}: {}", path.display(), e);
                return None;
            }
        };
        if !output.status.success() {
            log::warn!(
                "ffprobe exited with {:?} for {}: {}",
                output.status.code(),
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        let metadata = parse_probe_json(&String::from_utf8_lossy(&output.stdout));
        match &metadata {
            Some(m) => log::debug!(
                "Probed {}: video={} audio={} fps={:.2}",
                path.display(),
                m.video_codec,
                m.audio_codec,
                m.fps
            ),
            None => log::warn!("ffprobe output for {} is not valid JSON", path.display()),
        }
        metadata
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    codec_name: Option<String>,
    #[serde(default)]
    r_frame_rate: Option<String>,
    #[serde(default)]
    avg_frame_rate: Option<String>,
}

impl ProbeStream {
    fn is(&self, kind: &str) -> bool {
        self.codec_type.as_deref() == Some(kind)
    }

    fn fps(&self) -> f64 {
        let real = self.r_frame_rate.as_deref().map(parse_frame_rate).unwrap_or(0.0);
        if real > 0.0 {
            return real;
        }
        self.avg_frame_rate.as_deref().map(parse_frame_rate).unwrap_or(0.0)
    }
}

/// Extracts [`StreamMetadata`] from ffprobe's JSON output.
pub fn parse_probe_json(json: &str) -> Option<StreamMetadata> {
    let parsed: ProbeOutput = serde_json::from_str(json).ok()?;

    let video = parsed.streams.iter().find(|s| s.is("video"));
    let audio = parsed.streams.iter().find(|s| s.is("audio"));

    Some(StreamMetadata {
        video_codec: video.and_then(|s| s.codec_name.clone()).unwrap_or_default(),
        audio_codec: audio.and_then(|s| s.codec_name.clone()).unwrap_or_default(),
        fps: video.map(ProbeStream::fps).unwrap_or(0.0),
    })
}

/// Parses an ffprobe rate such as `30000/1001` or `25`.
///
/// Anything unparsable, a zero denominator or a non-finite result gives 0.0.
pub fn parse_frame_rate(rate: &str) -> f64 {
    let rate = rate.trim();
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = match num.trim().parse() {
                Ok(n) => n,
                Err(_) => return 0.0,
            };
            let den: f64 = match den.trim().parse() {
                Ok(d) => d,
                Err(_) => return 0.0,
            };
            if den == 0.0 {
                return 0.0;
            }
            num / den
        }
        None => rate.parse().unwrap_or(0.0),
    };

    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
