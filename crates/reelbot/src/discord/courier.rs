use async_trait::async_trait;
use reelcore::{AppError, AppResult, Courier, DownloadError, MediaAttachment, Requester};
use serenity::all::{ChannelId, CreateAttachment, CreateMessage, Http, UserId};
use std::sync::Arc;

/// Delivers results to the requester's direct messages
pub struct DiscordCourier {
    http: Arc<Http>,
}

impl DiscordCourier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    async fn dm_channel(&self, to: &Requester) -> AppResult<ChannelId> {
        let channel = UserId::new(to.id)
            .create_dm_channel(&self.http)
            .await
            .map_err(delivery_error)?;
        Ok(channel.id)
    }
}

fn delivery_error(e: serenity::Error) -> AppError {
    DownloadError::DeliveryFailed(e.to_string()).into()
}

#[async_trait]
impl Courier for DiscordCourier {
    async fn send_media(&self, to: &Requester, caption: &str, attachment: MediaAttachment) -> AppResult<()> {
        let channel = self.dm_channel(to).await?;
        let file = CreateAttachment::bytes(attachment.data, attachment.filename);
        channel
            .send_message(&self.http, CreateMessage::new().content(caption).add_file(file))
            .await
            .map_err(delivery_error)?;
        log::debug!("📨 DM with attachment sent to {}", to);
        Ok(())
    }

    async fn send_notice(&self, to: &Requester, text: &str) -> AppResult<()> {
        let channel = self.dm_channel(to).await?;
        channel
            .send_message(&self.http, CreateMessage::new().content(text))
            .await
            .map_err(delivery_error)?;
        Ok(())
    }
}
