/*!

Fixed-interval polling. A condition is evaluated every `interval` until it reports success, it
returns an error, or `timeout` elapses. A running evaluation is never cancelled: once it returns
after the deadline, the poll ends with a timeout.

!*/

use crate::error::{self, Result};
use log::trace;
use snafu::ensure;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Wait `interval`, then evaluate `condition` every `interval` until it returns `Ok(true)`. An
/// error returned by `condition` stops the poll and is returned as is.
pub async fn poll<F, Fut>(
    what: &str,
    interval: Duration,
    timeout: Duration,
    mut condition: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    poll_inner(what, interval, timeout, false, || {
        let fut = condition();
        async move { Ok(fut.await?.then_some(())) }
    })
    .await
}

/// Like [`poll`] but `condition` is evaluated once before the first wait.
pub async fn poll_immediate<F, Fut>(
    what: &str,
    interval: Duration,
    timeout: Duration,
    mut condition: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    poll_inner(what, interval, timeout, true, || {
        let fut = condition();
        async move { Ok(fut.await?.then_some(())) }
    })
    .await
}

/// Wait `interval`, then evaluate `f` every `interval` until it returns `Ok(Some(value))` and
/// return that value.
pub async fn poll_for<T, F, Fut>(
    what: &str,
    interval: Duration,
    timeout: Duration,
    f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    poll_inner(what, interval, timeout, false, f).await
}

async fn poll_inner<T, F, Fut>(
    what: &str,
    interval: Duration,
    timeout: Duration,
    immediate: bool,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    trace!("polling for {} every {:?} up to {:?}", what, interval, timeout);
    let poller = Poller::new(what, interval, timeout);
    if !immediate {
        poller.wait().await?;
    }
    loop {
        if let Some(value) = f().await? {
            return Ok(value);
        }
        poller.wait().await?;
    }
}

/// The pacing of a poll whose attempts need mutable access to their caller and therefore cannot
/// be expressed as a [`poll`] condition. An attempt always runs to completion; the deadline is
/// only checked between attempts.
#[derive(Debug)]
pub struct Poller<'a> {
    what: &'a str,
    interval: Duration,
    timeout: Duration,
    start: Instant,
}

impl<'a> Poller<'a> {
    pub fn new(what: &'a str, interval: Duration, timeout: Duration) -> Self {
        Self {
            what,
            interval,
            timeout,
            start: Instant::now(),
        }
    }

    /// Sleep until the next attempt, or fail with [`Error::Timeout`] if the deadline has passed.
    ///
    /// [`Error::Timeout`]: crate::Error::Timeout
    pub async fn wait(&self) -> Result<()> {
        ensure!(
            self.start.elapsed() < self.timeout,
            error::TimeoutSnafu {
                what: self.what,
                timeout: self.timeout,
            }
        );
        sleep(self.interval).await;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn poll_stops_when_condition_holds() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let timeout = Duration::from_secs(60);
        poll("three calls", Duration::from_secs(3), timeout, move || async move {
            Ok(counter.fetch_add(1, Ordering::SeqCst) == 2)
        })
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_times_out() {
        let start = tokio::time::Instant::now();
        let err = poll("never", Duration::from_secs(3), Duration::from_secs(15), || async {
            Ok(false)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, crate::Error::Timeout { .. }));
        assert!(start.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_returns_condition_error() {
        let err = poll("error", Duration::from_secs(1), Duration::from_secs(10), || async {
            error::EmptySnafu { what: "value" }.fail()
        })
        .await
        .unwrap_err();
        assert!(matches!(err, crate::Error::Empty { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_immediate_does_not_wait_first() {
        let start = tokio::time::Instant::now();
        poll_immediate("now", Duration::from_secs(30), Duration::from_secs(60), || async {
            Ok(true)
        })
        .await
        .unwrap();
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_for_returns_value() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let interval = Duration::from_secs(1);
        let value = poll_for("value", interval, Duration::from_secs(10), move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok((n > 1).then(|| format!("call {}", n)))
        })
        .await
        .unwrap();
        assert_eq!(value, "call 2");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_condition_is_not_cancelled() {
        let start = tokio::time::Instant::now();
        let interval = Duration::from_secs(3);
        poll("slow", interval, Duration::from_secs(10), || async {
            sleep(Duration::from_secs(20)).await;
            Ok(true)
        })
        .await
        .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(23));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_failing_condition_times_out_after_returning() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let err = poll("slow", Duration::from_secs(3), Duration::from_secs(10), move || {
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_secs(20)).await;
                Ok(false)
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, crate::Error::Timeout { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn poller_paces_attempts() {
        let poller = Poller::new("steps", Duration::from_secs(1), Duration::from_secs(3));
        let start = tokio::time::Instant::now();
        for _ in 0..3 {
            poller.wait().await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_secs(3));
        let err = poller.wait().await.unwrap_err();
        assert!(matches!(err, crate::Error::Timeout { .. }));
    }
}
