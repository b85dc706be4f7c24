//! Fixed-cadence polling with explicit cancellation.
//!
//! Each tick is spawned as its own task, so a slow tick never delays the
//! next one and overlapping ticks run side by side. Stopping cancels the
//! timer loop and waits for it to exit; ticks already running are left to
//! finish on their own.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default dashboard cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Handle to a running poll loop.
///
/// Dropping the handle cancels the loop as well, but only
/// [`PollHandle::stop`] guarantees that no tick starts after it returns.
#[derive(Debug)]
pub struct PollHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Token that fires when polling stops
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel future ticks and wait for the timer loop to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Poll loop ended abnormally: {}", e);
            }
        }
        tracing::debug!("Polling stopped");
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub struct PollingScheduler;

impl PollingScheduler {
    /// Run `callback` now and then every `interval` until stopped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(callback: F, interval: Duration) -> PollHandle
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        // tokio::time::interval panics on a zero period
        let period = interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = loop_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                tracing::trace!("Poll tick");
                tokio::spawn(callback());
            }
        });

        tracing::debug!("Polling started every {:?}", period);
        PollHandle {
            cancel,
            task: Some(task),
        }
    }

    pub async fn stop(handle: PollHandle) {
        handle.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(counter: Arc<AtomicUsize>) -> impl Fn() -> std::future::Ready<()> + Send + 'static {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_invokes_immediately_then_on_cadence() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = PollingScheduler::start(counting(count.clone()), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_stop() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = PollingScheduler::start(counting(count.clone()), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(250)).await;
        PollingScheduler::stop(handle).await;
        let at_stop = count.load(Ordering::SeqCst);
        assert_eq!(at_stop, 3);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), at_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_ticks_overlap() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        let (s, f) = (started.clone(), finished.clone());
        let handle = PollingScheduler::start(
            move || {
                let (s, f) = (s.clone(), f.clone());
                async move {
                    s.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(250)).await;
                    f.fetch_add(1, Ordering::SeqCst);
                }
            },
            Duration::from_millis(100),
        );

        tokio::time::sleep(Duration::from_millis(320)).await;
        // Ticks at 0, 100, 200, 300 all started; only the first has finished
        assert_eq!(started.load(Ordering::SeqCst), 4);
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_tick_completes_after_stop() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        let (s, f) = (started.clone(), finished.clone());
        let handle = PollingScheduler::start(
            move || {
                let (s, f) = (s.clone(), f.clone());
                async move {
                    s.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    f.fetch_add(1, Ordering::SeqCst);
                }
            },
            Duration::from_secs(2),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop().await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_loop() {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = PollingScheduler::start(counting(count.clone()), Duration::from_millis(100));
        let token = handle.cancellation_token();
        assert!(handle.is_running());

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(handle);
        assert!(token.is_cancelled());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
