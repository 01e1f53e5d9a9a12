use thiserror::Error;

use crate::download::error::DownloadError;

/// Centralized error types for the application
///
/// All errors in the pipeline are converted to this enum for consistent error handling.
/// Uses `thiserror` for automatic error conversion and display formatting.
///
/// # Example
///
/// ```no_run
/// use reelcore::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Fetch/transcode/delivery errors
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// HTTP errors (cookie material fetched from a link)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP status code errors
    #[error("HTTP request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// The job queue refused a new request
    #[error("Queue is full ({0} requests pending)")]
    QueueFull(usize),

    /// The job queue is shutting down
    #[error("Queue is shutting down")]
    ShuttingDown,
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Text suitable for showing to the requesting user.
    ///
    /// Download errors carry their own user-facing wording; everything else
    /// is reported verbatim.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Download(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}
