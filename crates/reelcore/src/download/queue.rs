//! Bounded job queue for video requests.
//!
//! Each accepted request runs as its own task. A semaphore caps how many
//! pipelines run at once, a counter caps how many may be waiting or running,
//! and a shared cancellation token stops everything on shutdown. Dropping a
//! running pipeline kills its child processes (`kill_on_drop`) and removes its
//! workspace (`Drop` guard).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::download::pipeline::{handle_request, PipelineContext, Request};
use crate::download::send::Courier;

pub struct JobQueue {
    ctx: PipelineContext,
    permits: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    max_pending: usize,
    tracker: TaskTracker,
    cancel: CancellationToken,
    grace: Duration,
}

/// Decrements the pending counter when a job ends, however it ends
struct PendingSlot(Arc<AtomicUsize>);

impl Drop for PendingSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl JobQueue {
    /// Queue sized from the context's configuration
    pub fn new(ctx: PipelineContext) -> Self {
        let max_concurrent = ctx.config.max_concurrent_downloads;
        let max_pending = ctx.config.max_queue_size;
        Self::with_limits(
            ctx,
            max_concurrent,
            max_pending,
            Duration::from_secs(config::queue::SHUTDOWN_GRACE_SECS),
        )
    }

    pub fn with_limits(ctx: PipelineContext, max_concurrent: usize, max_pending: usize, grace: Duration) -> Self {
        Self {
            ctx,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            pending: Arc::new(AtomicUsize::new(0)),
            max_pending,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            grace,
        }
    }

    /// Requests waiting or running
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Accepts a request and spawns its pipeline.
    ///
    /// Returns the number of requests ahead of or beside it (including
    /// itself), or [`AppError::QueueFull`] / [`AppError::ShuttingDown`].
    pub fn submit(&self, request: Request, courier: Arc<dyn Courier>) -> AppResult<usize> {
        if self.cancel.is_cancelled() {
            return Err(AppError::ShuttingDown);
        }

        let max = self.max_pending;
        let previous = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n < max { Some(n + 1) } else { None })
            .map_err(|n| {
                log::warn!("🚫 Queue full ({} pending), rejecting {}", n, request.url);
                AppError::QueueFull(n)
            })?;
        let slot = PendingSlot(Arc::clone(&self.pending));

        let ctx = self.ctx.clone();
        let permits = Arc::clone(&self.permits);
        let cancel = self.cancel.clone();
        let position = previous + 1;
        log::info!("📋 [{}] Queued (position {})", request.short_id(), position);

        self.tracker.spawn(async move {
            let _slot = slot;
            let rid = request.short_id();

            let _permit = tokio::select! {
                _ = cancel.cancelled() => {
                    log::warn!("[{}] Dropped before start: shutting down", rid);
                    return;
                }
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(e) => {
                        log::error!("Failed to acquire permit for {}: {}", rid, e);
                        return;
                    }
                },
            };
            log::debug!("[{}] Running (permits available: {})", rid, permits.available_permits());

            tokio::select! {
                _ = cancel.cancelled() => {
                    log::warn!("[{}] Cancelled mid-flight: shutting down", rid);
                }
                outcome = handle_request(&ctx, &request, courier.as_ref()) => {
                    log::debug!("[{}] Finished: {:?}", rid, outcome);
                }
            }
        });

        Ok(position)
    }

    /// Stops accepting work and waits for every accepted request to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Cancels everything and waits up to the grace period for tasks to unwind.
    pub async fn shutdown(&self) {
        log::info!("🛑 Shutting down job queue ({} pending)", self.pending());
        self.cancel.cancel();
        self.tracker.close();
        if tokio::time::timeout(self.grace, self.tracker.wait()).await.is_err() {
            log::warn!(
                "⚠️  {} job(s) still running after {}s grace period",
                self.tracker.len(),
                self.grace.as_secs()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::download::send::Requester;
    use crate::testing::{FakeFetcher, RecordingCourier, ScriptedTranscoder, StaticInspector};
    use tempfile::TempDir;
    use url::Url;

    fn context(temp: &TempDir, fetcher: Arc<FakeFetcher>) -> PipelineContext {
        let config = Config {
            temp_dir: temp.path().to_path_buf(),
            ..Config::default()
        };
        PipelineContext::new(
            config,
            fetcher,
            Arc::new(StaticInspector::unknown()),
            Arc::new(ScriptedTranscoder::unavailable()),
        )
        .unwrap()
    }

    fn request(n: u64) -> Request {
        Request::new(
            Url::parse(&format!("https://example.com/v/{}", n)).unwrap(),
            Requester {
                id: n,
                name: format!("user{}", n),
            },
        )
    }

    fn workspace_count(temp: &TempDir) -> usize {
        std::fs::read_dir(temp.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_queue_bound_rejects_overflow() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::hanging());
        let queue = JobQueue::with_limits(context(&temp, fetcher.clone()), 1, 2, Duration::from_secs(5));
        let courier: Arc<dyn Courier> = Arc::new(RecordingCourier::default());

        assert_eq!(queue.submit(request(1), courier.clone()).unwrap(), 1);
        assert_eq!(queue.submit(request(2), courier.clone()).unwrap(), 2);
        let err = queue.submit(request(3), courier.clone()).unwrap_err();
        assert!(matches!(err, AppError::QueueFull(2)));
        assert_eq!(queue.pending(), 2);

        queue.shutdown().await;
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::failing("nope").with_delay(Duration::from_millis(50)));
        let queue = JobQueue::with_limits(context(&temp, fetcher.clone()), 2, 100, Duration::from_secs(5));
        let courier = Arc::new(RecordingCourier::default());

        for n in 0..6 {
            queue.submit(request(n), courier.clone()).unwrap();
        }
        queue.drain().await;

        assert_eq!(fetcher.calls(), 6);
        assert!(fetcher.max_in_flight() <= 2);
        assert_eq!(courier.notices().await.len(), 6);
        assert_eq!(queue.pending(), 0);
        assert_eq!(workspace_count(&temp), 0);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_refused() {
        let temp = TempDir::new().unwrap();
        let queue = JobQueue::with_limits(
            context(&temp, Arc::new(FakeFetcher::failing("x"))),
            1,
            10,
            Duration::from_secs(1),
        );
        queue.shutdown().await;

        assert!(queue.is_shutting_down());
        let err = queue
            .submit(request(1), Arc::new(RecordingCourier::default()))
            .unwrap_err();
        assert!(matches!(err, AppError::ShuttingDown));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_running_pipeline_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let fetcher = Arc::new(FakeFetcher::hanging());
        let queue = JobQueue::with_limits(context(&temp, fetcher.clone()), 1, 10, Duration::from_secs(5));
        let courier = Arc::new(RecordingCourier::default());

        queue.submit(request(1), courier.clone()).unwrap();
        fetcher.wait_started().await;
        assert_eq!(workspace_count(&temp), 1);

        queue.shutdown().await;

        assert_eq!(workspace_count(&temp), 0);
        assert!(courier.deliveries().await.is_empty());
        assert_eq!(queue.pending(), 0);
    }
}
