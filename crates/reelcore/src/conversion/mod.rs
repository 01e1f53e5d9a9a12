//! Media normalization engine.
//!
//! Turns whatever the extractor produced into a broadly playable
//! MP4 / H.264 / AAC file:
//! - `probe`: stream metadata via ffprobe
//! - `transcode`: remux and re-encode invocations of ffmpeg
//! - `normalize`: the decision engine choosing between them, with fallbacks

pub mod normalize;
pub mod probe;
pub mod transcode;

use thiserror::Error;

/// Errors that can occur during a single transcode run
///
/// These never reach the requester: the decision engine degrades to the
/// next strategy (and finally the original file) instead.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    #[error("Input file not found: {0}")]
    InputNotFound(String),

    #[error("Output creation failed: {0}")]
    OutputFailed(String),

    #[error("FFmpeg timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for conversion operations
pub type ConversionResult<T> = Result<T, ConversionError>;

pub use normalize::{classify, NormalizationOutcome, Normalizer, Verdict};
pub use probe::{FfprobeInspector, MediaInspector, StreamMetadata};
pub use transcode::{FfmpegTranscoder, TranscodeProfile, Transcoder};
