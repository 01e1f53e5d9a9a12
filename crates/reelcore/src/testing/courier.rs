use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::error::{AppError, AppResult};
use crate::download::error::DownloadError;
use crate::download::send::{Courier, MediaAttachment, Requester};

/// A video handed to the courier
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: Requester,
    pub caption: String,
    pub attachment: MediaAttachment,
}

/// Courier that records everything instead of talking to a platform
#[derive(Debug, Default)]
pub struct RecordingCourier {
    deliveries: Mutex<Vec<Delivery>>,
    notices: Mutex<Vec<(Requester, String)>>,
    fail_media: bool,
    fail_notices: bool,
}

impl RecordingCourier {
    /// Courier whose media sends fail (DMs closed, upload rejected)
    pub fn failing_media() -> Self {
        Self {
            fail_media: true,
            ..Self::default()
        }
    }

    /// Courier where every send fails
    pub fn unreachable() -> Self {
        Self {
            fail_media: true,
            fail_notices: true,
            ..Self::default()
        }
    }

    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    pub async fn notices(&self) -> Vec<String> {
        self.notices.lock().await.iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl Courier for RecordingCourier {
    async fn send_media(&self, to: &Requester, caption: &str, attachment: MediaAttachment) -> AppResult<()> {
        if self.fail_media {
            return Err(DownloadError::DeliveryFailed(format!("cannot reach {}", to)).into());
        }
        self.deliveries.lock().await.push(Delivery {
            to: to.clone(),
            caption: caption.to_string(),
            attachment,
        });
        Ok(())
    }

    async fn send_notice(&self, to: &Requester, text: &str) -> AppResult<()> {
        if self.fail_notices {
            return Err(AppError::Validation(format!("cannot reach {}", to)));
        }
        self.notices.lock().await.push((to.clone(), text.to_string()));
        Ok(())
    }
}
