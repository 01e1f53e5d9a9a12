//! Upload size policy
//!
//! The gate never sends an oversized artifact. It compares the final file
//! against the configured ceiling and, for deliverable files, picks the
//! attachment name shown to the requester.

use std::path::{Path, PathBuf};

use crate::core::config::{self, Config};
use crate::core::error::AppResult;
use crate::core::utils::escape_filename;

/// Outcome of the size check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryDecision {
    Deliver { path: PathBuf, filename: String, size: u64 },
    RejectTooLarge { size: u64, ceiling: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryGate {
    ceiling: u64,
}

impl DeliveryGate {
    /// Gate with an explicit ceiling in bytes
    pub fn new(ceiling: u64) -> Self {
        Self { ceiling }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_upload_bytes())
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Decides for a file of known size. Exactly `ceiling` bytes is deliverable.
    pub fn decide(&self, path: &Path, size: u64, title: &str) -> DeliveryDecision {
        if size > self.ceiling {
            return DeliveryDecision::RejectTooLarge {
                size,
                ceiling: self.ceiling,
            };
        }
        DeliveryDecision::Deliver {
            path: path.to_path_buf(),
            filename: attachment_name(title, path),
            size,
        }
    }

    /// Stats `path` and decides.
    pub async fn check(&self, path: &Path, title: &str) -> AppResult<DeliveryDecision> {
        let size = tokio::fs::metadata(path).await?.len();
        Ok(self.decide(path, size, title))
    }
}

/// `{title}.{ext}`, with the artifact's extension (default `mp4`)
pub fn attachment_name(title: &str, path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .unwrap_or(config::transcode::OUTPUT_EXTENSION);
    format!("{}.{}", escape_filename(title, config::download::DEFAULT_TITLE), ext)
}
