use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use std::path::PathBuf;

use reelcore::core::utils::extract_url;
use reelcore::core::{init_logger, log_cookies_configuration, log_tools_availability};
use reelcore::{handle_request, Config, PipelineContext, Request, RequestOutcome, Requester};

mod cli;
mod discord;
mod local;
mod settings;

use cli::{Cli, Commands};
use discord::BotSession;
use local::LocalCourier;
use settings::BotSettings;

/// Main entry point for the Discord bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (configuration, logging, token, client).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // .env first: LOG_FILE_PATH may live there
    let _ = dotenv();

    let config = Config::from_env()?;
    init_logger(&config.log_file_path)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(config).await,
        Commands::Fetch { url, output } => run_fetch(config, &url, output).await,
        Commands::Doctor => run_doctor(config).await,
    }
}

async fn run_bot(config: Config) -> Result<()> {
    log::info!("🚀 Starting reelbot v{}", env!("CARGO_PKG_VERSION"));

    let settings = BotSettings::from_env()?;

    log_cookies_configuration(&config);
    log_tools_availability(&config).await;
    log::info!(
        "⚙️  Upload limit {} MB, {} concurrent downloads, queue of {}",
        config.max_upload_mb,
        config.max_concurrent_downloads,
        config.max_queue_size
    );

    let session = BotSession::init(&settings, PipelineContext::from_config(config)?).await?;
    session.run().await
}

/// Runs one request locally; the result lands in `output` instead of a DM.
async fn run_fetch(config: Config, raw_url: &str, output: Option<PathBuf>) -> Result<()> {
    let url = extract_url(raw_url).ok_or_else(|| anyhow!("Not a valid http(s) URL: {}", raw_url))?;

    let ctx = PipelineContext::from_config(config)?;
    let courier = LocalCourier::new(output.unwrap_or_else(|| PathBuf::from(".")));
    let request = Request::new(
        url,
        Requester {
            id: 0,
            name: "cli".to_string(),
        },
    );

    log::info!("📂 Saving into {}", courier.output_dir().display());

    match handle_request(&ctx, &request, &courier).await {
        RequestOutcome::Delivered { filename, size, strategy } => {
            log::info!("✅ {} ({} bytes, {})", filename, size, strategy);
            Ok(())
        }
        RequestOutcome::RejectedTooLarge { size, ceiling } => {
            Err(anyhow!("Result is {} bytes, above the {} byte limit", size, ceiling))
        }
        RequestOutcome::Failed(reason) => Err(anyhow!(reason)),
    }
}

async fn run_doctor(config: Config) -> Result<()> {
    log_cookies_configuration(&config);
    let report = log_tools_availability(&config).await;

    if !config.cookies.is_empty() {
        let ctx = PipelineContext::from_config(config)?;
        match ctx.config.cookies.resolve(&ctx.http).await {
            Ok(Some(jar)) => log::info!("🍪 Cookies normalize to {} entries", count_cookie_lines(&jar)),
            Ok(None) => log::warn!("⚠️  Cookie source is empty"),
            Err(e) => log::error!("❌ Cookies cannot be used: {}", e),
        }
    }

    if report.ytdlp {
        Ok(())
    } else {
        Err(anyhow!("yt-dlp is required but was not found"))
    }
}

fn count_cookie_lines(jar: &str) -> usize {
    jar.lines()
        .filter(|line| !line.trim().is_empty() && (!line.starts_with('#') || line.starts_with("#HttpOnly_")))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_cookie_lines_skips_comments() {
        let jar = "# Netscape HTTP Cookie File\n\n.a.com\tTRUE\t/\tFALSE\t0\tx\t1\n#HttpOnly_.a.com\tTRUE\t/\tFALSE\t0\ty\t2\n";
        assert_eq!(count_cookie_lines(jar), 2);
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_urls() {
        let err = run_fetch(Config::default(), "not a url", None).await.unwrap_err();
        assert!(err.to_string().contains("Not a valid"));
    }
}
