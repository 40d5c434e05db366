//! The retry engine.
//!
//! Every action runs under [`retry`]: the operation is invoked once, and on
//! failure re-invoked at a fixed interval until it succeeds or the time
//! budget runs out. The recorder sees the loop as a
//! `RetryStart .. RetryAttempt{n} .. RetryEnd` bracket — recorded only when
//! at least one retry actually happened, so actions that succeed first try
//! leave no retry noise in the report.
//!
//! Attempt accounting: `RetryEnd.attempts` counts *retries*; the operation
//! itself runs `attempts + 1` times.

use std::future::Future;
use std::time::Duration;

use kest_types::{Event, RetryReason, parse_duration};
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::{KestError, Result};
use crate::recorder::Recorder;

/// Default time budget for one action.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default pause between attempts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

/// Time budget and pacing for one retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl RetryOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Builds options from Go-like duration strings, e.g. `("30s", "1s")`.
    pub fn parse(timeout: &str, interval: &str) -> Result<Self> {
        Ok(Self {
            timeout: parse_duration(timeout)?,
            interval: parse_duration(interval)?,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Runs `op` under the time budget, pacing re-invocations by the interval.
///
/// The operation always runs at least once. On exhaustion the last failure
/// is raised wrapped in [`KestError::TimedOut`] so the budget is visible,
/// with the underlying diagnostic preserved as the cause.
pub async fn retry<T, F, Fut>(recorder: &Recorder, options: RetryOptions, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let deadline = Instant::now() + options.timeout;

    // First invocation is silent: no retry events unless a retry happens.
    let mut last_error = match op().await {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    let mut attempts: u32 = 0;
    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        let remaining = deadline - now;
        let pause = options.interval.min(remaining);
        // A pause that lands on the deadline would buy nothing.
        if pause >= remaining {
            break;
        }

        if attempts == 0 {
            recorder.record(Event::RetryStart);
        }
        sleep(pause).await;

        attempts += 1;
        recorder.record(Event::RetryAttempt { attempt: attempts });
        debug!(attempt = attempts, "retrying");

        match op().await {
            Ok(value) => {
                recorder.record(Event::RetryEnd {
                    attempts,
                    success: true,
                    reason: RetryReason::Success,
                    error: None,
                });
                return Ok(value);
            }
            Err(err) => last_error = err,
        }
    }

    if attempts > 0 {
        recorder.record(Event::RetryEnd {
            attempts,
            success: false,
            reason: RetryReason::Timeout,
            error: Some(last_error.summary()),
        });
    }
    debug!(attempts, "retry budget exhausted");
    Err(KestError::TimedOut {
        budget: options.timeout,
        cause: Some(Box::new(last_error)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_records_no_retry_events() {
        let recorder = Recorder::new();
        let calls = counter();
        let calls_in = calls.clone();

        let value = retry(&recorder, RetryOptions::default(), move || {
            let calls = calls_in.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, KestError>(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(recorder.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_a_later_attempt_brackets_the_retries() {
        let recorder = Recorder::new();
        let calls = counter();
        let calls_in = calls.clone();

        let value = retry(&recorder, RetryOptions::default(), move || {
            let calls = calls_in.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(KestError::assertion("not yet"))
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let events = recorder.events();
        assert_eq!(events[0], Event::RetryStart);
        assert_eq!(events[1], Event::RetryAttempt { attempt: 1 });
        assert_eq!(events[2], Event::RetryAttempt { attempt: 2 });
        assert!(matches!(
            events[3],
            Event::RetryEnd {
                attempts: 2,
                success: true,
                reason: RetryReason::Success,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_raises_timed_out_with_the_last_error_as_cause() {
        let recorder = Recorder::new();
        let calls = counter();
        let calls_in = calls.clone();
        let options = RetryOptions::new(Duration::from_millis(1000), Duration::from_millis(200));

        let err = retry(&recorder, options, move || {
            let calls = calls_in.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(KestError::assertion("still wrong"))
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, KestError::TimedOut { .. }));
        assert_eq!(err.to_string(), "Timed out after 1s");
        let KestError::TimedOut { cause, .. } = &err else {
            unreachable!()
        };
        assert_eq!(cause.as_deref().unwrap().to_string(), "still wrong");

        // attempts + 1 invocations in total.
        let events = recorder.events();
        let attempts = events
            .iter()
            .filter(|e| matches!(e, Event::RetryAttempt { .. }))
            .count() as u32;
        assert!(attempts > 0);
        assert_eq!(calls.load(Ordering::SeqCst), attempts + 1);

        let Some(Event::RetryEnd {
            attempts: ended,
            success,
            reason,
            error,
        }) = events.last()
        else {
            panic!("expected RetryEnd, got {events:?}");
        };
        assert_eq!(*ended, attempts);
        assert!(!success);
        assert_eq!(*reason, RetryReason::Timeout);
        assert_eq!(error.as_ref().unwrap().message, "still wrong");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_timeout_invokes_exactly_once_with_no_events() {
        let recorder = Recorder::new();
        let calls = counter();
        let calls_in = calls.clone();
        let options = RetryOptions::new(Duration::ZERO, Duration::from_millis(200));

        let err = retry(&recorder, options, move || {
            let calls = calls_in.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(KestError::assertion("nope"))
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, KestError::TimedOut { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn options_parse_duration_strings() {
        let options = RetryOptions::parse("30s", "1s").unwrap();
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.interval, Duration::from_secs(1));
        assert!(RetryOptions::parse("30 s", "1s").is_err());
    }
}
