//! Periodic tokio task with an explicit cancellation token.
//!
//! A [`Ticker`] calls its closure once per period until either the closure
//! returns `false` or the ticker is cancelled.  The cancellation token is a
//! `oneshot` channel: [`Ticker::cancel`] fires it and waits for the task to
//! finish, and simply dropping the ticker also closes the channel, so a
//! forgotten ticker never outlives its owner.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

pub struct Ticker {
    cancel_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Ticker {
    /// Spawn a ticker whose first tick fires one `period` from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut cancel_rx => break,
                    _ = interval.tick() => {
                        if !on_tick() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            cancel_tx: Some(cancel_tx),
            task,
        }
    }

    /// Stop the ticker and wait until its task has exited.  After this
    /// returns the closure will never run again.
    pub async fn cancel(mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            if e.is_panic() {
                log::warn!("ticker task panicked: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let ticker = Ticker::spawn(Duration::from_millis(100), move || {
            c.fetch_add(1, Ordering::SeqCst);
            true
        });

        // First tick is one period out, not immediate.
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 10);

        ticker.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_further_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let ticker = Ticker::spawn(Duration::from_millis(100), move || {
            c.fetch_add(1, Ordering::SeqCst);
            true
        });

        time::sleep(Duration::from_millis(350)).await;
        ticker.cancel().await;
        let at_cancel = count.load(Ordering::SeqCst);
        assert_eq!(at_cancel, 3);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), at_cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn returning_false_ends_the_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let ticker = Ticker::spawn(Duration::from_millis(100), move || {
            c.fetch_add(1, Ordering::SeqCst) < 1
        });

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(ticker.task.is_finished());
        ticker.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_ticker_cancels_it() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let ticker = Ticker::spawn(Duration::from_millis(100), move || {
            c.fetch_add(1, Ordering::SeqCst);
            true
        });
        drop(ticker);

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
