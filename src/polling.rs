use std::future::Future;
use tokio::time::{sleep, Duration, Instant};
use tracing::info;

use crate::error::{AppError, Result};

/// Outcome of a single status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    Ready(T),
    Pending,
}

/// Backoff grows by `step` after every pending check, up to `max_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub step: Duration,
    pub max_interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            step: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl PollSettings {
    /// Sleep before the check following the `attempt`-th pending one (1-based).
    pub fn interval(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt).min(self.max_interval)
    }
}

/// Runs `check` until it is ready, sleeping 1s, 2s, 3s, ... in between.
///
/// Errors returned by `check` end the loop immediately; only `Pending`
/// is retried. `waiting_message` is logged before every sleep.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    waiting_message: &str,
    settings: &PollSettings,
    mut check: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Poll<T>>>,
{
    let started = Instant::now();
    let mut attempt = 0;

    loop {
        if let Poll::Ready(value) = check().await? {
            return Ok(value);
        }

        attempt += 1;
        let delay = settings.interval(attempt);
        if started.elapsed() + delay > settings.timeout {
            return Err(AppError::PollTimeout {
                what: what.to_string(),
                waited_secs: started.elapsed().as_secs(),
            });
        }

        info!("{waiting_message}");
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn settings() -> PollSettings {
        PollSettings {
            step: Duration::from_secs(1),
            max_interval: Duration::from_secs(3),
            timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn interval_grows_linearly_and_is_capped() {
        let settings = settings();
        let intervals: Vec<u64> = (1..=5).map(|n| settings.interval(n).as_secs()).collect();
        assert_eq!(intervals, vec![1, 2, 3, 3, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_once_ready_after_increasing_sleeps() {
        let calls = Cell::new(0);
        let started = Instant::now();

        let value = poll_until("deletion", "Waiting", &settings(), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Ok(if n < 4 { Poll::Pending } else { Poll::Ready(n) }) }
        })
        .await
        .unwrap();

        assert_eq!(value, 4);
        // 1s + 2s + 3s between the four checks.
        assert_eq!(started.elapsed().as_secs(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_never_ready() {
        let mut settings = settings();
        settings.timeout = Duration::from_secs(10);

        let err = poll_until("stack update", "Waiting", &settings, || async {
            Ok::<_, AppError>(Poll::<()>::Pending)
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::PollTimeout { ref what, .. } if what == "stack update"));
    }

    #[tokio::test(start_paused = true)]
    async fn errors_are_not_retried() {
        let calls = Cell::new(0);

        let err = poll_until("deletion", "Waiting", &settings(), || {
            calls.set(calls.get() + 1);
            async { Err::<Poll<()>, _>(AppError::Interrupted) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Interrupted));
        assert_eq!(calls.get(), 1);
    }
}
