use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use thiserror::Error;
use tracing::debug;

use crate::sonar::{SonarApi, SystemStatus};

const SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("SonarQube did not report UP within {0:?}")]
    TimedOut(Duration),

    #[error("Waiting for SonarQube was cancelled")]
    Cancelled,

    #[error("Readiness timeout {0:?} is too large")]
    TimeoutOutOfRange(Duration),
}

/// Exponential backoff bounded by an overall deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max_delay: Duration,
    pub timeout: Duration,
}

impl Backoff {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout, ..Self::default() }
    }

    fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_delay)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Poll the system status endpoint until it reports `UP`.
///
/// Transport failures count as "not yet": the web server only starts
/// listening part way through boot. Each request is bounded by what is left
/// of `policy.timeout`, so the deadline holds even against a silent server.
/// `cancel` is checked between polls and while sleeping, not while a request
/// is in flight.
pub fn wait_until_ready(
    api: &dyn SonarApi,
    policy: &Backoff,
    cancel: &AtomicBool,
) -> Result<SystemStatus, ReadinessError> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Waiting for SonarQube to come up...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = poll(api, policy, cancel, &spinner);
    spinner.finish_and_clear();
    result
}

fn poll(
    api: &dyn SonarApi,
    policy: &Backoff,
    cancel: &AtomicBool,
    spinner: &ProgressBar,
) -> Result<SystemStatus, ReadinessError> {
    let started = Instant::now();
    let deadline = started
        .checked_add(policy.timeout)
        .ok_or(ReadinessError::TimeoutOutOfRange(policy.timeout))?;
    let mut delay = policy.initial;
    let mut attempt = 0u32;

    loop {
        if cancel.load(Ordering::SeqCst) {
            return Err(ReadinessError::Cancelled);
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ReadinessError::TimedOut(policy.timeout));
        }

        attempt += 1;
        match api.system_status(remaining) {
            Ok(status) if status.is_up() => {
                debug!(attempt, elapsed = ?started.elapsed(), "SonarQube is up");
                return Ok(status);
            }
            Ok(status) => {
                debug!(attempt, status = %status.status, "SonarQube not ready");
                spinner.set_message(format!("SonarQube is {}...", status.status));
            }
            Err(err) => debug!(attempt, error = %err, "SonarQube not reachable yet"),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(ReadinessError::TimedOut(policy.timeout));
        }
        sleep_unless_cancelled(delay.min(deadline - now), cancel)?;
        delay = policy.next(delay);
    }
}

fn sleep_unless_cancelled(total: Duration, cancel: &AtomicBool) -> Result<(), ReadinessError> {
    let until = Instant::now() + total;
    loop {
        if cancel.load(Ordering::SeqCst) {
            return Err(ReadinessError::Cancelled);
        }
        let now = Instant::now();
        if now >= until {
            return Ok(());
        }
        thread::sleep(SLICE.min(until - now));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::sonar::{ApiError, ProjectOutcome, TokenResponse};

    struct StatusSequence {
        up_after: u32,
        calls: Cell<u32>,
        timeouts: RefCell<Vec<Duration>>,
        cancel_on: Option<(u32, &'static AtomicBool)>,
    }

    impl StatusSequence {
        fn new(up_after: u32) -> Self {
            Self { up_after, calls: Cell::new(0), timeouts: RefCell::default(), cancel_on: None }
        }
    }

    impl SonarApi for StatusSequence {
        fn create_project(&self, _: &str, _: &str) -> Result<ProjectOutcome, ApiError> {
            unreachable!()
        }

        fn create_token(&self, _: &str) -> Result<TokenResponse, ApiError> {
            unreachable!()
        }

        fn system_status(&self, timeout: Duration) -> Result<SystemStatus, ApiError> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            self.timeouts.borrow_mut().push(timeout);
            if let Some((at, flag)) = self.cancel_on
                && call == at
            {
                flag.store(true, Ordering::SeqCst);
            }
            let status = if call > self.up_after { "UP" } else { "STARTING" };
            Ok(SystemStatus { id: None, version: None, status: status.to_string() })
        }
    }

    fn fast(timeout_ms: u64) -> Backoff {
        Backoff {
            initial: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[test]
    fn returns_once_status_is_up() {
        let api = StatusSequence::new(3);
        let status = wait_until_ready(&api, &fast(5_000), &AtomicBool::new(false)).unwrap();
        assert!(status.is_up());
        assert_eq!(api.calls.get(), 4);
    }

    #[test]
    fn gives_up_after_timeout() {
        let api = StatusSequence::new(u32::MAX);
        let err = wait_until_ready(&api, &fast(30), &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(err, ReadinessError::TimedOut(_)));
    }

    #[test]
    fn oversized_timeout_fails_without_polling() {
        let api = StatusSequence::new(0);
        let policy = Backoff::with_timeout(Duration::from_secs(u64::MAX));

        let err = wait_until_ready(&api, &policy, &AtomicBool::new(false)).unwrap_err();

        assert!(matches!(err, ReadinessError::TimeoutOutOfRange(_)));
        assert_eq!(api.calls.get(), 0);
    }

    #[test]
    fn each_request_is_bounded_by_the_remaining_budget() {
        let api = StatusSequence::new(u32::MAX);
        let policy = fast(30);

        wait_until_ready(&api, &policy, &AtomicBool::new(false)).unwrap_err();

        let timeouts = api.timeouts.borrow();
        assert!(!timeouts.is_empty());
        assert!(timeouts.iter().all(|timeout| *timeout <= policy.timeout && !timeout.is_zero()));
        assert!(timeouts.windows(2).all(|pair| pair[1] <= pair[0]));
    }

    #[test]
    fn cancellation_stops_polling() {
        static CANCEL: AtomicBool = AtomicBool::new(false);
        let mut api = StatusSequence::new(u32::MAX);
        api.cancel_on = Some((2, &CANCEL));

        let err = wait_until_ready(&api, &fast(5_000), &CANCEL).unwrap_err();
        assert!(matches!(err, ReadinessError::Cancelled));
        assert_eq!(api.calls.get(), 2);
    }

    #[test]
    fn delay_doubles_up_to_the_cap() {
        let policy = Backoff::default();
        assert_eq!(policy.next(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(policy.next(Duration::from_secs(8)), Duration::from_secs(10));
    }
}
