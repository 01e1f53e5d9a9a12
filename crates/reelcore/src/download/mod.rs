//! Download management and delivery

pub mod cookies;
pub mod error;
pub mod fetch;
pub mod gate;
pub mod pipeline;
pub mod queue;
pub mod send;
pub mod workspace;
pub mod ytdlp_errors;

// Re-exports for convenience
pub use cookies::CookieSources;
pub use error::DownloadError;
pub use fetch::{FetchOptions, FetchResult, MediaFetcher, YtDlpFetcher};
pub use gate::{DeliveryDecision, DeliveryGate};
pub use pipeline::{handle_request, PipelineContext, Request, RequestOutcome};
pub use queue::JobQueue;
pub use send::{notify_best_effort, Courier, MediaAttachment, Requester};
pub use workspace::Workspace;
