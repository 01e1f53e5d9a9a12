//! Courier for the `fetch` command: saves videos to a directory and prints notices.

use async_trait::async_trait;
use reelcore::{AppResult, Courier, MediaAttachment, Requester};
use std::path::{Path, PathBuf};

pub struct LocalCourier {
    output_dir: PathBuf,
}

impl LocalCourier {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl Courier for LocalCourier {
    async fn send_media(&self, _to: &Requester, caption: &str, attachment: MediaAttachment) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(&attachment.filename);
        tokio::fs::write(&path, &attachment.data).await?;
        println!("{}", caption);
        println!("💾 Saved to {}", path.display());
        Ok(())
    }

    async fn send_notice(&self, _to: &Requester, text: &str) -> AppResult<()> {
        println!("{}", text);
        Ok(())
    }
}
