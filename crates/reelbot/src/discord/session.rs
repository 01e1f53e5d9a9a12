//! Bot session lifecycle: connect, serve until a signal, tear down.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use reelcore::{JobQueue, PipelineContext};
use secrecy::ExposeSecret;
use serenity::Client;

use super::handler::Handler;
use crate::settings::BotSettings;

pub struct BotSession {
    client: Client,
    queue: Arc<JobQueue>,
}

impl BotSession {
    /// Builds the gateway client and the job queue behind it.
    ///
    /// The `/setup_panel` command is registered once the gateway reports ready.
    pub async fn init(settings: &BotSettings, ctx: PipelineContext) -> Result<Self> {
        let queue = Arc::new(JobQueue::new(ctx));
        let handler = Handler::new(Arc::clone(&queue));

        let client = Client::builder(settings.token.expose_secret(), Handler::intents())
            .event_handler(handler)
            .await
            .context("Failed to create Discord client")?;

        Ok(Self { client, queue })
    }

    /// Runs until SIGINT/SIGTERM or a gateway failure, then tears down.
    pub async fn run(mut self) -> Result<()> {
        let shard_manager = Arc::clone(&self.client.shard_manager);

        let outcome = tokio::select! {
            res = self.client.start() => res.context("Discord gateway stopped"),
            _ = shutdown_signal() => {
                log::info!("🛑 Shutdown signal received");
                Ok(())
            }
        };

        log::info!("🔌 Disconnecting from Discord");
        shard_manager.shutdown_all().await;

        log::info!("🧹 Stopping job queue ({} pending)", self.queue.pending());
        self.queue.shutdown().await;
        log::info!("👋 Bye");

        outcome
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                log::warn!("⚠️ Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
