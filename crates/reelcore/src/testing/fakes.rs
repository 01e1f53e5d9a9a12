use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use url::Url;

use crate::conversion::probe::{MediaInspector, StreamMetadata};
use crate::conversion::transcode::{TranscodeProfile, Transcoder};
use crate::conversion::{ConversionError, ConversionResult};
use crate::core::error::AppResult;
use crate::download::error::DownloadError;
use crate::download::fetch::{resolve_title, FetchOptions, FetchResult, MediaFetcher};

/// What a [`FakeFetcher`] does when called
#[derive(Debug, Clone)]
pub enum FetchBehavior {
    /// Writes `data` to `media/<file_name>` and reports `title`
    Produce {
        file_name: String,
        data: Vec<u8>,
        title: Option<String>,
    },
    /// Fails like yt-dlp with a user-facing message
    Fail(String),
    /// Reports success with `media/<file_name>` without writing it
    ReportMissing(String),
    /// Never finishes (until the task is dropped)
    Hang,
}

/// Stand-in for yt-dlp
#[derive(Debug)]
pub struct FakeFetcher {
    behavior: FetchBehavior,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    started: Notify,
    last_options: Mutex<Option<FetchOptions>>,
}

impl FakeFetcher {
    pub fn new(behavior: FetchBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            started: Notify::new(),
            last_options: Mutex::new(None),
        }
    }

    pub fn producing(file_name: &str, data: Vec<u8>, title: Option<&str>) -> Self {
        Self::new(FetchBehavior::Produce {
            file_name: file_name.to_string(),
            data,
            title: title.map(str::to_string),
        })
    }

    pub fn failing(message: &str) -> Self {
        Self::new(FetchBehavior::Fail(message.to_string()))
    }

    pub fn reporting_missing(file_name: &str) -> Self {
        Self::new(FetchBehavior::ReportMissing(file_name.to_string()))
    }

    pub fn hanging() -> Self {
        Self::new(FetchBehavior::Hang)
    }

    /// Every fetch sleeps this long before acting
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of fetches observed running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Resolves once a fetch has started
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub async fn last_options(&self) -> Option<FetchOptions> {
        self.last_options.lock().await.clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch(&self, _url: &Url, media_dir: &Path, options: &FetchOptions) -> AppResult<FetchResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        *self.last_options.lock().await = Some(options.clone());
        self.started.notify_one();

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.behavior {
            FetchBehavior::Produce { file_name, data, title } => {
                let path = media_dir.join(file_name);
                tokio::fs::write(&path, data).await?;
                Ok(FetchResult {
                    path,
                    title: resolve_title(title.as_deref()),
                })
            }
            FetchBehavior::Fail(message) => Err(DownloadError::FetchFailed(message.clone()).into()),
            FetchBehavior::ReportMissing(file_name) => Ok(FetchResult {
                path: media_dir.join(file_name),
                title: resolve_title(None),
            }),
            FetchBehavior::Hang => {
                std::future::pending::<()>().await;
                Err(DownloadError::Timeout("never".to_string()).into())
            }
        }
    }
}

/// Stand-in for ffprobe
#[derive(Debug)]
pub struct StaticInspector {
    metadata: Option<StreamMetadata>,
    calls: AtomicUsize,
}

impl StaticInspector {
    pub fn new(metadata: Option<StreamMetadata>) -> Self {
        Self {
            metadata,
            calls: AtomicUsize::new(0),
        }
    }

    /// Reports the given codecs and frame rate
    pub fn streams(video_codec: &str, audio_codec: &str, fps: f64) -> Self {
        Self::new(Some(StreamMetadata {
            video_codec: video_codec.to_string(),
            audio_codec: audio_codec.to_string(),
            fps,
        }))
    }

    /// Behaves like a failed probe
    pub fn unknown() -> Self {
        Self::new(None)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaInspector for StaticInspector {
    async fn probe(&self, _path: &Path) -> Option<StreamMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.metadata.clone()
    }
}

/// What a [`ScriptedTranscoder`] run does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeBehavior {
    /// Writes a non-empty output and succeeds
    Succeed,
    /// Fails without touching the output
    Fail,
    /// Writes a partial output, then fails
    FailLeavingPartial,
    /// Reports success but leaves an empty output
    EmptyOutput,
}

/// Stand-in for ffmpeg with one scripted behavior per profile
#[derive(Debug)]
pub struct ScriptedTranscoder {
    available: bool,
    remux: TranscodeBehavior,
    reencode: TranscodeBehavior,
    output_bytes: usize,
    calls: Mutex<Vec<TranscodeProfile>>,
}

impl ScriptedTranscoder {
    pub fn new(remux: TranscodeBehavior, reencode: TranscodeBehavior) -> Self {
        Self {
            available: true,
            remux,
            reencode,
            output_bytes: 16,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Behaves like a host without ffmpeg
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(TranscodeBehavior::Fail, TranscodeBehavior::Fail)
        }
    }

    /// Size of successful outputs
    pub fn with_output_bytes(mut self, len: usize) -> Self {
        self.output_bytes = len;
        self
    }

    pub async fn calls(&self) -> Vec<TranscodeProfile> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Transcoder for ScriptedTranscoder {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn transcode(&self, profile: TranscodeProfile, input: &Path, output: &Path) -> ConversionResult<()> {
        self.calls.lock().await.push(profile);
        if !input.exists() {
            return Err(ConversionError::InputNotFound(input.display().to_string()));
        }

        let behavior = match profile {
            TranscodeProfile::Remux => self.remux,
            TranscodeProfile::Reencode => self.reencode,
        };
        match behavior {
            TranscodeBehavior::Succeed => {
                tokio::fs::write(output, vec![0u8; self.output_bytes.max(1)]).await?;
                Ok(())
            }
            TranscodeBehavior::Fail => Err(ConversionError::FfmpegError(format!("{} failed", profile.label()))),
            TranscodeBehavior::FailLeavingPartial => {
                tokio::fs::write(output, b"partial").await?;
                Err(ConversionError::FfmpegError(format!("{} died midway", profile.label())))
            }
            TranscodeBehavior::EmptyOutput => {
                tokio::fs::write(output, b"").await?;
                Ok(())
            }
        }
    }
}
