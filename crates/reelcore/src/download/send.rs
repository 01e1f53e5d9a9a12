//! Outbound delivery to the requester.
//!
//! This module provides:
//! - The [`Courier`] seam the pipeline delivers through (Discord DMs in the bot,
//!   files on disk for the local `fetch` command, fakes in tests)
//! - User-facing message texts
//! - [`notify_best_effort`], the single place where notice failures are swallowed

use async_trait::async_trait;
use std::fmt;

use crate::core::error::AppResult;
use crate::core::utils::format_megabytes;

/// The platform identity of whoever submitted a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: u64,
    pub name: String,
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A finished artifact, already read into memory
#[derive(Clone, PartialEq, Eq)]
pub struct MediaAttachment {
    pub filename: String,
    pub data: Vec<u8>,
}

impl fmt::Debug for MediaAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaAttachment")
            .field("filename", &self.filename)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Delivers results privately to a requester.
#[async_trait]
pub trait Courier: Send + Sync {
    /// Sends the video with an accompanying caption.
    async fn send_media(&self, to: &Requester, caption: &str, attachment: MediaAttachment) -> AppResult<()>;

    /// Sends a plain text notice (errors, size rejections).
    async fn send_notice(&self, to: &Requester, text: &str) -> AppResult<()>;
}

/// Caption accompanying a delivered video
pub fn ready_caption(title: &str) -> String {
    format!("📥 Your video is ready:\n{}", title)
}

/// Notice sent when the final artifact exceeds the ceiling
pub fn too_large_notice(size: u64, ceiling: u64) -> String {
    format!(
        "⚠️ File too large ({}MB). Limit is {}MB.",
        format_megabytes(size),
        format_megabytes(ceiling)
    )
}

/// Notice sent when a request fails
pub fn failure_notice(detail: &str) -> String {
    format!("❌ Download failed:\n{}", detail)
}

/// Sends a notice once; a failure is logged and dropped.
///
/// Returns whether the notice was sent.
pub async fn notify_best_effort(courier: &dyn Courier, to: &Requester, text: &str) -> bool {
    match courier.send_notice(to, text).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Failed to notify {}: {}", to, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppError;
    use pretty_assertions::assert_eq;

    struct BrokenCourier;

    #[async_trait]
    impl Courier for BrokenCourier {
        async fn send_media(&self, _to: &Requester, _caption: &str, _attachment: MediaAttachment) -> AppResult<()> {
            Err(AppError::Validation("closed".into()))
        }

        async fn send_notice(&self, _to: &Requester, _text: &str) -> AppResult<()> {
            Err(AppError::Validation("DMs closed".into()))
        }
    }

    #[test]
    fn test_message_texts() {
        assert_eq!(ready_caption("Cat"), "📥 Your video is ready:\nCat");
        assert_eq!(
            too_large_notice(150 * 1024 * 1024 + 100 * 1024, 100 * 1024 * 1024),
            "⚠️ File too large (150.1MB). Limit is 100.0MB."
        );
        assert_eq!(
            too_large_notice(2 * 1024 * 1024, 1024 * 1024 + 512 * 1024),
            "⚠️ File too large (2.0MB). Limit is 1.5MB."
        );
        assert_eq!(failure_notice("boom"), "❌ Download failed:\nboom");
    }

    #[test]
    fn test_attachment_debug_hides_bytes() {
        let attachment = MediaAttachment {
            filename: "a.mp4".into(),
            data: vec![1, 2, 3],
        };
        assert_eq!(format!("{:?}", attachment), "MediaAttachment { filename: \"a.mp4\", len: 3 }");
    }

    #[tokio::test]
    async fn test_notify_best_effort_swallows_failure() {
        let to = Requester {
            id: 1,
            name: "alice".into(),
        };
        assert!(!notify_best_effort(&BrokenCourier, &to, "hello").await);
    }
}
