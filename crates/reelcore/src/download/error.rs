use std::fmt;

/// Structured error type for the fetch → normalize → deliver pipeline.
///
/// Categorized variants drive both the user-facing wording and log grouping.
/// Transcoding failures never reach the user directly: the normalization
/// engine degrades instead, so `TranscodeFailed` only shows up in logs.
#[derive(Debug)]
pub enum DownloadError {
    /// yt-dlp failed (bad exit code, extractor error, network)
    FetchFailed(String),
    /// Expected file not found after fetching
    FileNotFound(String),
    /// Fetch or processing timed out
    Timeout(String),
    /// Cookie material could not be resolved or normalized
    Cookies(String),
    /// FFmpeg processing failure
    TranscodeFailed(String),
    /// Failed to hand the artifact to the chat platform
    DeliveryFailed(String),
    /// Process execution failure (spawn, exit code)
    Process(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for DownloadError {}

impl DownloadError {
    /// Returns subcategory for log grouping
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::FetchFailed(_) => "fetch_failed",
            DownloadError::FileNotFound(_) => "file_not_found",
            DownloadError::Timeout(_) => "timeout",
            DownloadError::Cookies(_) => "cookies",
            DownloadError::TranscodeFailed(_) => "transcode_failed",
            DownloadError::DeliveryFailed(_) => "delivery_failed",
            DownloadError::Process(_) => "process",
        }
    }

    /// Returns the inner message
    pub fn message(&self) -> &str {
        match self {
            DownloadError::FetchFailed(msg)
            | DownloadError::FileNotFound(msg)
            | DownloadError::Timeout(msg)
            | DownloadError::Cookies(msg)
            | DownloadError::TranscodeFailed(msg)
            | DownloadError::DeliveryFailed(msg)
            | DownloadError::Process(msg) => msg,
        }
    }

    /// Message shown to the requester in their private channel
    pub fn user_message(&self) -> String {
        match self {
            DownloadError::FetchFailed(msg) => msg.clone(),
            DownloadError::FileNotFound(_) => "The download finished but no video file was produced.".to_string(),
            DownloadError::Timeout(_) => "The download took too long and was stopped. Try again later.".to_string(),
            DownloadError::DeliveryFailed(_) => "The video could not be sent.".to_string(),
            other => format!("Something went wrong while processing the video ({}).", other.subcategory()),
        }
    }
}
