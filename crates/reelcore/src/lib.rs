//! Reel - private short-video delivery
//!
//! This library holds the platform-agnostic part of the bot: fetching a video
//! with yt-dlp, normalizing it to MP4 / H.264 / AAC with ffmpeg, gating it on
//! upload size and handing it to a [`Courier`] for private delivery.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, process helpers
//! - `download`: workspace, cookies, fetcher, size gate, pipeline, job queue
//! - `conversion`: probe, transcode profiles, normalization decision engine
//! - `testing`: fakes for the external tools and the chat platform

pub mod conversion;
pub mod core;
pub mod download;
pub mod testing;

// Re-export commonly used types for convenience
pub use conversion::{NormalizationOutcome, Verdict};
pub use crate::core::{config, AppError, AppResult, Config};
pub use download::{
    handle_request, Courier, DeliveryDecision, DownloadError, JobQueue, MediaAttachment, PipelineContext, Request,
    RequestOutcome, Requester,
};
