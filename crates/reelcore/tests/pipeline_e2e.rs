//! End-to-end pipeline runs with scripted tools.
//!
//! Every scenario checks what the requester received and that the
//! per-request workspace is gone afterwards.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use reelcore::conversion::transcode::TranscodeProfile;
use reelcore::testing::{FakeFetcher, RecordingCourier, ScriptedTranscoder, StaticInspector, TranscodeBehavior};
use reelcore::{handle_request, Config, PipelineContext, Request, RequestOutcome, Requester};
use tempfile::TempDir;
use url::Url;

fn config(temp: &Path) -> Config {
    Config {
        temp_dir: temp.to_path_buf(),
        ..Config::default()
    }
}

fn request() -> Request {
    Request::new(
        Url::parse("https://www.tiktok.com/@someone/video/7300000000000000000").unwrap(),
        Requester {
            id: 42,
            name: "alice".into(),
        },
    )
}

fn leftover_entries(temp: &TempDir) -> usize {
    std::fs::read_dir(temp.path()).unwrap().count()
}

#[tokio::test]
async fn test_vp9_is_reencoded_and_delivered_privately() {
    let temp = TempDir::new().unwrap();
    let transcoder = Arc::new(
        ScriptedTranscoder::new(TranscodeBehavior::Succeed, TranscodeBehavior::Succeed).with_output_bytes(2048),
    );
    let ctx = PipelineContext::new(
        config(temp.path()),
        Arc::new(FakeFetcher::producing("Dancing cat_7300.webm", vec![7u8; 4096], Some("Dancing cat"))),
        Arc::new(StaticInspector::streams("vp9", "opus", 30.0)),
        transcoder.clone(),
    )
    .unwrap();
    let courier = RecordingCourier::default();
    let req = request();

    let outcome = handle_request(&ctx, &req, &courier).await;

    assert_eq!(
        outcome,
        RequestOutcome::Delivered {
            filename: "Dancing cat.mp4".into(),
            size: 2048,
            strategy: "reencoded",
        }
    );
    assert_eq!(transcoder.calls().await, vec![TranscodeProfile::Reencode]);

    let deliveries = courier.deliveries().await;
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].to, req.requester);
    assert_eq!(deliveries[0].caption, "📥 Your video is ready:\nDancing cat");
    assert_eq!(deliveries[0].attachment.filename, "Dancing cat.mp4");
    assert_eq!(deliveries[0].attachment.data.len(), 2048);
    assert!(courier.notices().await.is_empty());
    assert_eq!(leftover_entries(&temp), 0);
}

#[tokio::test]
async fn test_compatible_file_is_remuxed() {
    let temp = TempDir::new().unwrap();
    let ctx = PipelineContext::new(
        config(temp.path()),
        Arc::new(FakeFetcher::producing("clip.mp4", vec![1u8; 100], Some("Clip"))),
        Arc::new(StaticInspector::streams("h264", "aac", 29.97)),
        Arc::new(ScriptedTranscoder::new(TranscodeBehavior::Succeed, TranscodeBehavior::Fail)),
    )
    .unwrap();
    let courier = RecordingCourier::default();

    let outcome = handle_request(&ctx, &request(), &courier).await;

    assert!(matches!(outcome, RequestOutcome::Delivered { strategy: "remuxed", .. }));
    assert_eq!(leftover_entries(&temp), 0);
}

#[tokio::test]
async fn test_without_ffmpeg_original_is_sent_with_its_extension() {
    let temp = TempDir::new().unwrap();
    let ctx = PipelineContext::new(
        config(temp.path()),
        Arc::new(FakeFetcher::producing("clip.webm", vec![1u8; 300], None)),
        Arc::new(StaticInspector::unknown()),
        Arc::new(ScriptedTranscoder::unavailable()),
    )
    .unwrap();
    let courier = RecordingCourier::default();

    let outcome = handle_request(&ctx, &request(), &courier).await;

    assert_eq!(
        outcome,
        RequestOutcome::Delivered {
            filename: "video.webm".into(),
            size: 300,
            strategy: "passed through",
        }
    );
    assert_eq!(courier.deliveries().await[0].attachment.data, vec![1u8; 300]);
    assert_eq!(leftover_entries(&temp), 0);
}

#[tokio::test]
async fn test_oversized_artifact_is_rejected_with_notice() {
    let temp = TempDir::new().unwrap();
    let ctx = PipelineContext::new(
        Config {
            max_upload_mb: 1,
            ..config(temp.path())
        },
        Arc::new(FakeFetcher::producing("big.webm", vec![0u8; 16], Some("Big"))),
        Arc::new(StaticInspector::streams("vp9", "opus", 30.0)),
        Arc::new(
            ScriptedTranscoder::new(TranscodeBehavior::Succeed, TranscodeBehavior::Succeed)
                .with_output_bytes(1024 * 1024 + 1),
        ),
    )
    .unwrap();
    let courier = RecordingCourier::default();

    let outcome = handle_request(&ctx, &request(), &courier).await;

    assert_eq!(
        outcome,
        RequestOutcome::RejectedTooLarge {
            size: 1024 * 1024 + 1,
            ceiling: 1024 * 1024,
        }
    );
    assert!(courier.deliveries().await.is_empty());
    assert_eq!(
        courier.notices().await,
        vec!["⚠️ File too large (1.0MB). Limit is 1.0MB.".to_string()]
    );
    assert_eq!(leftover_entries(&temp), 0);
}

#[tokio::test]
async fn test_fetch_failure_is_reported() {
    let temp = TempDir::new().unwrap();
    let ctx = PipelineContext::new(
        config(temp.path()),
        Arc::new(FakeFetcher::failing("The video is unavailable. It may be private or deleted.")),
        Arc::new(StaticInspector::unknown()),
        Arc::new(ScriptedTranscoder::unavailable()),
    )
    .unwrap();
    let courier = RecordingCourier::default();

    let outcome = handle_request(&ctx, &request(), &courier).await;

    assert_eq!(
        outcome,
        RequestOutcome::Failed("The video is unavailable. It may be private or deleted.".into())
    );
    assert_eq!(
        courier.notices().await,
        vec!["❌ Download failed:\nThe video is unavailable. It may be private or deleted.".to_string()]
    );
    assert_eq!(leftover_entries(&temp), 0);
}

#[tokio::test]
async fn test_unusable_cookies_do_not_block_the_request() {
    let temp = TempDir::new().unwrap();
    let mut cfg = config(temp.path());
    cfg.cookies.base64 = Some("%%% not base64 %%%".into());
    let fetcher = Arc::new(FakeFetcher::producing("clip.mp4", vec![1u8; 10], Some("Clip")));
    let ctx = PipelineContext::new(
        cfg,
        fetcher.clone(),
        Arc::new(StaticInspector::unknown()),
        Arc::new(ScriptedTranscoder::unavailable()),
    )
    .unwrap();
    let courier = RecordingCourier::default();

    let outcome = handle_request(&ctx, &request(), &courier).await;

    assert!(matches!(outcome, RequestOutcome::Delivered { .. }));
    assert_eq!(fetcher.last_options().await.unwrap().cookie_jar, None);
}

#[tokio::test]
async fn test_cookie_jar_is_written_into_the_workspace() {
    let temp = TempDir::new().unwrap();
    let mut cfg = config(temp.path());
    cfg.cookies.raw = Some("sessionid=abc; csrftoken=xyz".into());
    let fetcher = Arc::new(FakeFetcher::producing("clip.mp4", vec![1u8; 10], Some("Clip")));
    let ctx = PipelineContext::new(
        cfg,
        fetcher.clone(),
        Arc::new(StaticInspector::unknown()),
        Arc::new(ScriptedTranscoder::unavailable()),
    )
    .unwrap();
    let courier = RecordingCourier::default();

    handle_request(&ctx, &request(), &courier).await;

    let jar = fetcher.last_options().await.unwrap().cookie_jar.unwrap();
    assert!(jar.starts_with(temp.path()));
    assert_eq!(jar.file_name().unwrap(), "cookies.txt");
    assert!(!jar.exists());
    assert_eq!(leftover_entries(&temp), 0);
}

#[tokio::test]
async fn test_silent_cookie_link_does_not_stall_the_request() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(socket);
    });

    let temp = TempDir::new().unwrap();
    let mut cfg = config(temp.path());
    cfg.cookies.url = Some(format!("http://{}/cookies.txt", addr));
    cfg.cookies_timeout = Duration::from_millis(300);
    let fetcher = Arc::new(FakeFetcher::producing("clip.mp4", vec![1u8; 10], Some("Clip")));
    let ctx = PipelineContext::new(
        cfg,
        fetcher.clone(),
        Arc::new(StaticInspector::unknown()),
        Arc::new(ScriptedTranscoder::unavailable()),
    )
    .unwrap();
    let courier = RecordingCourier::default();

    let outcome = tokio::time::timeout(Duration::from_secs(10), handle_request(&ctx, &request(), &courier))
        .await
        .expect("request must not hang on the cookie link");

    assert!(matches!(outcome, RequestOutcome::Delivered { .. }), "{:?}", outcome);
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(fetcher.last_options().await.unwrap().cookie_jar, None);
    assert_eq!(leftover_entries(&temp), 0);
    server.abort();
}

#[tokio::test]
async fn test_missing_fetched_file_is_reported() {
    let temp = TempDir::new().unwrap();
    let ctx = PipelineContext::new(
        config(temp.path()),
        Arc::new(FakeFetcher::reporting_missing("ghost.mp4")),
        Arc::new(StaticInspector::unknown()),
        Arc::new(ScriptedTranscoder::new(TranscodeBehavior::Succeed, TranscodeBehavior::Succeed)),
    )
    .unwrap();
    let courier = RecordingCourier::default();

    let outcome = handle_request(&ctx, &request(), &courier).await;

    assert_eq!(
        outcome,
        RequestOutcome::Failed("The download finished but no video file was produced.".into())
    );
    assert!(courier.deliveries().await.is_empty());
    assert_eq!(
        courier.notices().await,
        vec!["❌ Download failed:\nThe download finished but no video file was produced.".to_string()]
    );
    assert_eq!(leftover_entries(&temp), 0);
}

#[tokio::test]
async fn test_delivery_failure_is_reported_best_effort() {
    let temp = TempDir::new().unwrap();
    let ctx = PipelineContext::new(
        config(temp.path()),
        Arc::new(FakeFetcher::producing("clip.mp4", vec![1u8; 10], Some("Clip"))),
        Arc::new(StaticInspector::unknown()),
        Arc::new(ScriptedTranscoder::unavailable()),
    )
    .unwrap();

    let courier = RecordingCourier::failing_media();
    let outcome = handle_request(&ctx, &request(), &courier).await;
    assert_eq!(outcome, RequestOutcome::Failed("The video could not be sent.".into()));
    assert_eq!(courier.notices().await.len(), 1);

    let unreachable = RecordingCourier::unreachable();
    let outcome = handle_request(&ctx, &request(), &unreachable).await;
    assert!(matches!(outcome, RequestOutcome::Failed(_)));
    assert_eq!(leftover_entries(&temp), 0);
}

/// Requires yt-dlp, ffprobe, ffmpeg and network access
#[tokio::test]
#[ignore]
async fn test_real_tools_end_to_end() {
    let temp = TempDir::new().unwrap();
    let ctx = PipelineContext::from_config(config(temp.path())).unwrap();
    if !reelcore::core::process::is_tool_available(&ctx.config.ytdl_bin, "--version").await {
        eprintln!("yt-dlp not installed, skipping");
        return;
    }
    let courier = RecordingCourier::default();
    let req = Request::new(
        Url::parse("https://www.youtube.com/shorts/tPEE9ZwTmy0").unwrap(),
        Requester {
            id: 1,
            name: "it".into(),
        },
    );

    let outcome = handle_request(&ctx, &req, &courier).await;

    assert!(matches!(outcome, RequestOutcome::Delivered { .. }), "{:?}", outcome);
    assert_eq!(leftover_entries(&temp), 0);
}
