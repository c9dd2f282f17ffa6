//! The wait loop.

use crate::config::{DEFAULT_POLL_INTERVAL, PROCESSING_TIMEOUT, TRANSIENT_FETCH_RETRY_BUDGET};
use crate::context::{instant_after, Context, FAR_FUTURE};
use crate::error::Doc2xError;
use crate::poll::classify::is_transient;
use crate::types::Operation;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, Interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Verdict of an evaluator on one fetched status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Not settled yet, keep polling.
    Pending,
    /// Terminal success; the fetched value is returned to the caller.
    Done,
}

/// Parameters of a single wait.
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    /// Label used in errors and logs.
    pub operation: Operation,
    /// Delay between attempts. Zero selects [`DEFAULT_POLL_INTERVAL`].
    pub interval: Duration,
    /// Applied only when the context has no deadline. Zero selects
    /// [`PROCESSING_TIMEOUT`].
    pub timeout: Duration,
    /// Transient fetch failures tolerated between two successful fetches.
    pub retry_budget: u32,
}

impl PollOptions {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            interval: DEFAULT_POLL_INTERVAL,
            timeout: PROCESSING_TIMEOUT,
            retry_budget: TRANSIENT_FETCH_RETRY_BUDGET,
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_budget(mut self, n: u32) -> Self {
        self.retry_budget = n;
        self
    }

    /// The interval actually slept between attempts.
    pub fn effective_interval(&self) -> Duration {
        if self.interval.is_zero() {
            DEFAULT_POLL_INTERVAL
        } else {
            self.interval
        }
    }
}

/// Poll `fetch` until `evaluate` settles, the context ends, or a fetch error
/// is permanent.
///
/// `uid` must be non-empty; callers validate it. The first fetch is issued
/// immediately and later ones one interval apart. The context handed to
/// `fetch` already carries the composed deadline, so in-flight requests are
/// abandoned when it expires.
///
/// # Errors
/// * the fetch error itself, when it is not transient or the retry budget
///   is spent;
/// * the evaluator's error, unchanged;
/// * [`Doc2xError::WaitAborted`] when the context is cancelled or its
///   deadline passes while waiting for the next tick.
pub async fn wait_with_polling<T, F, Fut, E>(
    ctx: &Context,
    uid: &str,
    options: PollOptions,
    mut fetch: F,
    mut evaluate: E,
) -> Result<T, Doc2xError>
where
    F: FnMut(Context, String) -> Fut,
    Fut: Future<Output = Result<T, Doc2xError>>,
    E: FnMut(&T) -> Result<Evaluation, Doc2xError>,
{
    let operation = options.operation;
    let period = options.effective_interval().min(FAR_FUTURE);
    let ctx = ctx.with_timeout_if_absent(options.timeout);

    let mut ticker = interval_at(instant_after(period), period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut retries_left = options.retry_budget;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        debug!(%operation, uid, attempt, "polling status");

        match fetch(ctx.clone(), uid.to_string()).await {
            Err(err) => {
                if retries_left == 0 || !is_transient(&err) {
                    debug!(%operation, uid, attempt, error = %err, "giving up");
                    return Err(err);
                }
                retries_left -= 1;
                warn!(
                    %operation,
                    uid,
                    attempt,
                    retries_left,
                    error = %err,
                    "transient status fetch failure, retrying"
                );
            }
            Ok(result) => {
                retries_left = options.retry_budget;
                match evaluate(&result)? {
                    Evaluation::Done => {
                        debug!(%operation, uid, attempt, "task settled");
                        return Ok(result);
                    }
                    Evaluation::Pending => {}
                }
            }
        }

        wait_for_next_tick(&ctx, &mut ticker, operation).await?;
    }
}

/// Block until the next tick, or fail once the context ends.
async fn wait_for_next_tick(
    ctx: &Context,
    ticker: &mut Interval,
    operation: Operation,
) -> Result<(), Doc2xError> {
    tokio::select! {
        biased;
        cause = ctx.done() => Err(Doc2xError::WaitAborted { operation, cause }),
        _ = ticker.tick() => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Interrupt;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn transient() -> Doc2xError {
        Doc2xError::io("get status", io::Error::from(io::ErrorKind::TimedOut))
    }

    fn opts() -> PollOptions {
        PollOptions::new(Operation::Parsing)
            .interval(Duration::from_millis(10))
            .timeout(Duration::from_secs(5))
    }

    #[test]
    fn zero_interval_uses_default() {
        let o = PollOptions::new(Operation::Conversion).interval(Duration::ZERO);
        assert_eq!(o.effective_interval(), Duration::from_secs(2));
        let o = o.interval(Duration::from_millis(250));
        assert_eq!(o.effective_interval(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn done_on_first_fetch() {
        let calls = AtomicU32::new(0);
        let out = wait_with_polling(
            &Context::background(),
            "uid-1",
            opts(),
            |_, uid| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(uid) }
            },
            |_| Ok(Evaluation::Done),
        )
        .await
        .unwrap();
        assert_eq!(out, "uid-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_fetch_is_immediate_then_one_interval_apart() {
        let start = Instant::now();
        let stamps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let s = Arc::clone(&stamps);
        wait_with_polling(
            &Context::background(),
            "uid",
            opts().interval(Duration::from_millis(100)),
            move |_, _| {
                let mut v = s.lock().unwrap();
                v.push(start.elapsed());
                let n = v.len();
                async move { Ok(n) }
            },
            |n| Ok(if *n == 3 { Evaluation::Done } else { Evaluation::Pending }),
        )
        .await
        .unwrap();

        let stamps = stamps.lock().unwrap();
        assert_eq!(
            *stamps,
            vec![
                Duration::ZERO,
                Duration::from_millis(100),
                Duration::from_millis(200)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_fails_on_first_transient() {
        let calls = AtomicU32::new(0);
        let err = wait_with_polling(
            &Context::background(),
            "uid",
            opts().retry_budget(0),
            |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(transient()) }
            },
            |_| Ok(Evaluation::Done),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Doc2xError::Io { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn evaluator_error_is_not_retried() {
        let evals = AtomicU32::new(0);
        let err = wait_with_polling(
            &Context::background(),
            "uid",
            opts(),
            |_, _| async { Ok(()) },
            |_| {
                evals.fetch_add(1, Ordering::SeqCst);
                Err(Doc2xError::TaskFailed {
                    operation: Operation::Parsing,
                    detail: "bad scan".into(),
                    trace_id: "unknown".into(),
                })
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("bad scan"));
        assert_eq!(evals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_sees_composed_deadline() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let s = Arc::clone(&seen);
        wait_with_polling(
            &Context::background(),
            "uid",
            opts().timeout(Duration::from_secs(42)),
            move |ctx, _| {
                *s.lock().unwrap() = ctx.remaining();
                async { Ok(()) }
            },
            |_| Ok(Evaluation::Done),
        )
        .await
        .unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(Duration::from_secs(42)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_context_stops_wait_with_cause() {
        let ctx = Context::background();
        ctx.cancel();
        let err = wait_with_polling(
            &ctx,
            "uid",
            opts(),
            |_, _| async { Ok(()) },
            |_| Ok(Evaluation::Pending),
        )
        .await
        .unwrap_err();
        assert_eq!(err.interrupt(), Some(Interrupt::Cancelled));
        assert_eq!(
            err.to_string(),
            "waiting for parsing cancelled: context canceled"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_timeout_waits_until_cancelled() {
        let ctx = Context::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(35)).await;
            canceller.cancel();
        });
        let err = wait_with_polling(
            &ctx,
            "uid",
            opts().timeout(Duration::MAX),
            |_, _| async { Ok(()) },
            |_| Ok(Evaluation::Pending),
        )
        .await
        .unwrap_err();
        assert_eq!(err.interrupt(), Some(Interrupt::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_interval_still_honours_timeout() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let err = wait_with_polling(
            &Context::background(),
            "uid",
            opts()
                .interval(Duration::MAX)
                .timeout(Duration::from_millis(100)),
            |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
            |_| Ok(Evaluation::Pending),
        )
        .await
        .unwrap_err();
        assert_eq!(err.interrupt(), Some(Interrupt::DeadlineExceeded));
        assert_eq!(start.elapsed(), Duration::from_millis(100));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
