//! Testing utilities for driving the pipeline without external tools
//!
//! Scripted stand-ins for yt-dlp, ffprobe, ffmpeg and the chat platform.
//! Each fake records what it was asked to do so tests can assert on the
//! sequence of steps, not just the final outcome.
//!
//! ```no_run
//! use std::sync::Arc;
//! use reelcore::testing::{FakeFetcher, RecordingCourier, ScriptedTranscoder, StaticInspector, TranscodeBehavior};
//! use reelcore::{Config, PipelineContext};
//!
//! let ctx = PipelineContext::new(
//!     Config::default(),
//!     Arc::new(FakeFetcher::producing("clip.webm", b"data".to_vec(), Some("Clip"))),
//!     Arc::new(StaticInspector::unknown()),
//!     Arc::new(ScriptedTranscoder::new(TranscodeBehavior::Succeed, TranscodeBehavior::Succeed)),
//! )
//! .unwrap();
//! let courier = RecordingCourier::default();
//! ```

pub mod courier;
pub mod fakes;

pub use courier::{Delivery, RecordingCourier};
pub use fakes::{FakeFetcher, FetchBehavior, ScriptedTranscoder, StaticInspector, TranscodeBehavior};
