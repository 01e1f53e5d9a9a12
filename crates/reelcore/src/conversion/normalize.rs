//! Normalization decision engine
//!
//! Picks the cheapest strategy that yields a broadly playable file and
//! degrades instead of failing:
//!
//! ```text
//! ffmpeg missing ───────────────────────────────▶ PassedThrough(original)
//! probe ─▶ h264/aac/sane fps ─▶ remux ─ ok ─────▶ Remuxed
//!                                   └ fail ─┐
//!        ─▶ anything else ──────────────────┴─▶ reencode ─ ok ─▶ Reencoded
//!                                                         └ fail ─▶ PassedThrough(original)
//! ```
//!
//! A run only counts as successful when the output exists and is non-empty,
//! whatever the transcoder reported. Failed outputs are removed before the
//! next step; the source is removed only after a successful transcode.

use std::path::{Path, PathBuf};

use super::probe::{MediaInspector, StreamMetadata};
use super::transcode::{TranscodeProfile, Transcoder};
use super::{ConversionError, ConversionResult};
use crate::core::config::transcode;
use crate::download::error::DownloadError;

/// What the probe says about a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Codecs already fit, only the container needs rewriting
    NeedsRemuxOnly,
    /// Unknown metadata, foreign codecs or an implausible frame rate
    NeedsReencode,
}

/// Classifies probe output. Missing metadata always means re-encode.
pub fn classify(metadata: Option<&StreamMetadata>) -> Verdict {
    let Some(meta) = metadata else {
        return Verdict::NeedsReencode;
    };

    let codecs_fit = meta.video_codec == transcode::TARGET_VIDEO_CODEC && meta.audio_codec == transcode::TARGET_AUDIO_CODEC;
    let fps_fits = (transcode::MIN_FPS..=transcode::MAX_FPS).contains(&meta.fps);

    if codecs_fit && fps_fits {
        Verdict::NeedsRemuxOnly
    } else {
        Verdict::NeedsReencode
    }
}

/// The final artifact; every variant is equally deliverable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizationOutcome {
    Remuxed(PathBuf),
    Reencoded(PathBuf),
    PassedThrough(PathBuf),
}

impl NormalizationOutcome {
    pub fn path(&self) -> &Path {
        match self {
            NormalizationOutcome::Remuxed(p)
            | NormalizationOutcome::Reencoded(p)
            | NormalizationOutcome::PassedThrough(p) => p,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NormalizationOutcome::Remuxed(_) => "remuxed",
            NormalizationOutcome::Reencoded(_) => "reencoded",
            NormalizationOutcome::PassedThrough(_) => "passed through",
        }
    }
}

/// Runs the decision engine against an inspector and a transcoder.
pub struct Normalizer<'a> {
    inspector: &'a dyn MediaInspector,
    transcoder: &'a dyn Transcoder,
}

impl<'a> Normalizer<'a> {
    pub fn new(inspector: &'a dyn MediaInspector, transcoder: &'a dyn Transcoder) -> Self {
        Self { inspector, transcoder }
    }

    /// Normalizes `source`, writing artifacts into `output_dir`.
    pub async fn normalize(&self, source: &Path, output_dir: &Path) -> NormalizationOutcome {
        if !self.transcoder.is_available().await {
            log::warn!("⚠️  ffmpeg unavailable, sending {} unconverted", source.display());
            return NormalizationOutcome::PassedThrough(source.to_path_buf());
        }

        let metadata = self.inspector.probe(source).await;
        let verdict = classify(metadata.as_ref());
        log::info!("🎞️ {} -> {:?} ({:?})", source.display(), verdict, metadata);

        if verdict == Verdict::NeedsRemuxOnly {
            if let Some(output) = self.attempt(TranscodeProfile::Remux, source, output_dir).await {
                remove_source(source).await;
                return NormalizationOutcome::Remuxed(output);
            }
            log::warn!("Remux failed for {}, falling back to re-encode", source.display());
        }

        if let Some(output) = self.attempt(TranscodeProfile::Reencode, source, output_dir).await {
            remove_source(source).await;
            return NormalizationOutcome::Reencoded(output);
        }

        log::error!("❌ Re-encode failed for {}, sending the original file", source.display());
        NormalizationOutcome::PassedThrough(source.to_path_buf())
    }

    async fn attempt(&self, profile: TranscodeProfile, source: &Path, output_dir: &Path) -> Option<PathBuf> {
        let output = output_dir.join(profile.output_name());

        let result = match self.transcoder.transcode(profile, source, &output).await {
            Ok(()) => verify_output(&output).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                log::info!("✅ {} succeeded: {}", profile.label(), output.display());
                return Some(output);
            }
            Err(e) => {
                let err = DownloadError::TranscodeFailed(format!("{}: {}", profile.label(), e));
                log::warn!("⚠️ [{}] {}", err.subcategory(), err);
            }
        }

        if let Err(e) = tokio::fs::remove_file(&output).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove partial output {}: {}", output.display(), e);
            }
        }
        None
    }
}

/// A run only counts when it left a non-empty regular file behind
async fn verify_output(output: &Path) -> ConversionResult<()> {
    let usable = tokio::fs::metadata(output)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false);
    if usable {
        Ok(())
    } else {
        Err(ConversionError::OutputFailed(format!(
            "{} is missing or empty",
            output.display()
        )))
    }
}

async fn remove_source(source: &Path) {
    if let Err(e) = tokio::fs::remove_file(source).await {
        log::warn!("Failed to remove source {}: {}", source.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTranscoder, StaticInspector, TranscodeBehavior};
    use tempfile::TempDir;

    fn meta(video: &str, audio: &str, fps: f64) -> StreamMetadata {
        StreamMetadata {
            video_codec: video.into(),
            audio_codec: audio.into(),
            fps,
        }
    }

    struct Setup {
        _dir: TempDir,
        root: PathBuf,
        source: PathBuf,
    }

    fn setup() -> Setup {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        std::fs::create_dir(root.join("media")).unwrap();
        let source = root.join("media").join("clip.webm");
        std::fs::write(&source, b"original").unwrap();
        Setup { _dir: dir, root, source }
    }

    #[test]
    fn test_classify_compatible_file() {
        assert_eq!(classify(Some(&meta("h264", "aac", 30.0))), Verdict::NeedsRemuxOnly);
        assert_eq!(classify(Some(&meta("h264", "aac", 15.0))), Verdict::NeedsRemuxOnly);
        assert_eq!(classify(Some(&meta("h264", "aac", 61.0))), Verdict::NeedsRemuxOnly);
    }

    #[test]
    fn test_classify_any_failing_condition() {
        assert_eq!(classify(None), Verdict::NeedsReencode);
        assert_eq!(classify(Some(&meta("vp9", "aac", 30.0))), Verdict::NeedsReencode);
        assert_eq!(classify(Some(&meta("hevc", "aac", 30.0))), Verdict::NeedsReencode);
        assert_eq!(classify(Some(&meta("h264", "opus", 30.0))), Verdict::NeedsReencode);
        assert_eq!(classify(Some(&meta("h264", "", 30.0))), Verdict::NeedsReencode);
        assert_eq!(classify(Some(&meta("h264", "aac", 14.9))), Verdict::NeedsReencode);
        assert_eq!(classify(Some(&meta("h264", "aac", 61.1))), Verdict::NeedsReencode);
        assert_eq!(classify(Some(&meta("h264", "aac", 0.0))), Verdict::NeedsReencode);
    }

    #[tokio::test]
    async fn test_unavailable_transcoder_passes_through_without_probing() {
        let s = setup();
        let inspector = StaticInspector::streams("vp9", "opus", 30.0);
        let transcoder = ScriptedTranscoder::unavailable();

        let outcome = Normalizer::new(&inspector, &transcoder).normalize(&s.source, &s.root).await;

        assert_eq!(outcome, NormalizationOutcome::PassedThrough(s.source.clone()));
        assert_eq!(inspector.calls(), 0);
        assert!(transcoder.calls().await.is_empty());
        assert!(s.source.exists());
    }

    #[tokio::test]
    async fn test_remux_success() {
        let s = setup();
        let inspector = StaticInspector::streams("h264", "aac", 30.0);
        let transcoder = ScriptedTranscoder::new(TranscodeBehavior::Succeed, TranscodeBehavior::Succeed);

        let outcome = Normalizer::new(&inspector, &transcoder).normalize(&s.source, &s.root).await;

        assert_eq!(outcome, NormalizationOutcome::Remuxed(s.root.join("remuxed.mp4")));
        assert_eq!(transcoder.calls().await, vec![TranscodeProfile::Remux]);
        assert!(!s.source.exists());
    }

    #[tokio::test]
    async fn test_remux_failure_escalates_to_reencode() {
        let s = setup();
        let inspector = StaticInspector::streams("h264", "aac", 30.0);
        let transcoder = ScriptedTranscoder::new(TranscodeBehavior::FailLeavingPartial, TranscodeBehavior::Succeed);

        let outcome = Normalizer::new(&inspector, &transcoder).normalize(&s.source, &s.root).await;

        assert_eq!(outcome, NormalizationOutcome::Reencoded(s.root.join("reencoded.mp4")));
        assert_eq!(
            transcoder.calls().await,
            vec![TranscodeProfile::Remux, TranscodeProfile::Reencode]
        );
        assert!(!s.root.join("remuxed.mp4").exists());
        assert!(!s.source.exists());
    }

    #[tokio::test]
    async fn test_empty_remux_output_counts_as_failure() {
        let s = setup();
        let inspector = StaticInspector::streams("h264", "aac", 30.0);
        let transcoder = ScriptedTranscoder::new(TranscodeBehavior::EmptyOutput, TranscodeBehavior::Succeed);

        let outcome = Normalizer::new(&inspector, &transcoder).normalize(&s.source, &s.root).await;

        assert!(matches!(outcome, NormalizationOutcome::Reencoded(_)));
        assert!(!s.root.join("remuxed.mp4").exists());
    }

    #[tokio::test]
    async fn test_verify_output_rejects_missing_and_empty_files() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.mp4");
        let empty = dir.path().join("empty.mp4");
        let full = dir.path().join("full.mp4");
        std::fs::write(&empty, b"").unwrap();
        std::fs::write(&full, b"frames").unwrap();

        assert!(matches!(verify_output(&missing).await, Err(ConversionError::OutputFailed(_))));
        assert!(matches!(verify_output(&empty).await, Err(ConversionError::OutputFailed(_))));
        assert!(matches!(verify_output(dir.path()).await, Err(ConversionError::OutputFailed(_))));
        assert!(verify_output(&full).await.is_ok());
    }

    #[tokio::test]
    async fn test_foreign_codec_goes_straight_to_reencode() {
        let s = setup();
        let inspector = StaticInspector::streams("vp9", "opus", 30.0);
        let transcoder = ScriptedTranscoder::new(TranscodeBehavior::Succeed, TranscodeBehavior::Succeed);

        let outcome = Normalizer::new(&inspector, &transcoder).normalize(&s.source, &s.root).await;

        assert_eq!(outcome, NormalizationOutcome::Reencoded(s.root.join("reencoded.mp4")));
        assert_eq!(transcoder.calls().await, vec![TranscodeProfile::Reencode]);
    }

    #[tokio::test]
    async fn test_both_failures_keep_original() {
        let s = setup();
        let inspector = StaticInspector::streams("h264", "aac", 30.0);
        let transcoder = ScriptedTranscoder::new(TranscodeBehavior::Fail, TranscodeBehavior::FailLeavingPartial);

        let outcome = Normalizer::new(&inspector, &transcoder).normalize(&s.source, &s.root).await;

        assert_eq!(outcome, NormalizationOutcome::PassedThrough(s.source.clone()));
        assert_eq!(outcome.path(), s.source.as_path());
        assert_eq!(std::fs::read(&s.source).unwrap(), b"original");
        assert!(!s.root.join("remuxed.mp4").exists());
        assert!(!s.root.join("reencoded.mp4").exists());
    }

    #[tokio::test]
    async fn test_unknown_metadata_reencode_failure_keeps_original() {
        let s = setup();
        let inspector = StaticInspector::unknown();
        let transcoder = ScriptedTranscoder::new(TranscodeBehavior::Succeed, TranscodeBehavior::EmptyOutput);

        let outcome = Normalizer::new(&inspector, &transcoder).normalize(&s.source, &s.root).await;

        assert_eq!(outcome, NormalizationOutcome::PassedThrough(s.source.clone()));
        assert_eq!(transcoder.calls().await, vec![TranscodeProfile::Reencode]);
        assert!(s.source.exists());
    }
}
