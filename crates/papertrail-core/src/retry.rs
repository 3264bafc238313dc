//! Retry with capped exponential backoff

use std::fmt::Display;
use std::time::Duration;

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            initial_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(60),
            factor: 2,
        }
    }
}

impl BackoffPolicy {
    /// Delay sequence: initial, initial*factor, ... capped at `max_delay`
    pub fn delays(&self) -> Delays {
        Delays {
            next: self.initial_delay.min(self.max_delay),
            max: self.max_delay,
            factor: self.factor.max(1),
        }
    }
}

/// Infinite iterator over backoff delays
#[derive(Debug, Clone)]
pub struct Delays {
    next: Duration,
    max: Duration,
    factor: u32,
}

impl Iterator for Delays {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = current
            .checked_mul(self.factor)
            .map_or(self.max, |d| d.min(self.max));
        Some(current)
    }
}

/// Blocking pause between attempts
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Every attempt failed
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

impl<E: Display> Display for Exhausted<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "gave up after {} attempts: {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: std::error::Error> std::error::Error for Exhausted<E> {}

/// Retry a fallible operation under `policy`.
///
/// `attempt_fn` receives the 1-based attempt index. Each failure is logged
/// and followed by a sleep from the policy's delay sequence, including the
/// last one, so a caller that moves straight on to its next request still
/// gives the remote side a pause.
pub fn retry_with_backoff<T, E: Display>(
    label: &str,
    policy: &BackoffPolicy,
    sleeper: &impl Sleeper,
    mut attempt_fn: impl FnMut(u32) -> Result<T, E>,
) -> Result<T, Exhausted<E>> {
    let max_attempts = policy.max_attempts.max(1);
    let mut delays = policy.delays();
    let mut attempt = 1u32;
    loop {
        match attempt_fn(attempt) {
            Ok(v) => {
                if attempt > 1 {
                    log::info!("{label}: attempt {attempt}/{max_attempts} succeeded");
                } else {
                    log::debug!("{label}: ok");
                }
                return Ok(v);
            }
            Err(e) => {
                let delay = delays.next().unwrap_or(policy.max_delay);
                if attempt < max_attempts {
                    log::warn!(
                        "{label}: attempt {attempt}/{max_attempts} failed: {e}, retrying in {}s",
                        delay.as_secs_f64()
                    );
                    sleeper.sleep(delay);
                    attempt += 1;
                } else {
                    log::error!("{label}: failed after {attempt} attempts: {e}");
                    sleeper.sleep(delay);
                    return Err(Exhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
            }
        }
    }
}
