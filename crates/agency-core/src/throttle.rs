//! Client-side throttling: per-key rate limiting, debouncing, and
//! retry-with-backoff.
//!
//! All state lives in values the caller owns and shares by reference. The
//! maps are guarded by `std::sync::Mutex`, so a [`ThrottleContext`] can be
//! shared across threads. A poisoned lock is recovered, not propagated: the
//! guarded maps hold only timestamps and counters.
//!
//! Every time-dependent method has an `_at` variant taking `now`, which the
//! plain variant calls with `Instant::now()`.

use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::{ProjectConfig, RetryConfig, ThrottleConfig};
use crate::error::ErrorCode;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Rejection from a [`RateLimiter`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThrottleError {
    #[error("rate limit exceeded for '{key}', retry after {retry_after:?}")]
    RateLimited { key: String, retry_after: Duration },
}

impl ThrottleError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::RateLimited { .. } => ErrorCode::RateLimited,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
    last_seen: Instant,
}

/// Fixed-window rate limiter keyed by operation name.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: u32,
    window: Duration,
    idle: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    /// `max_calls == 0` admits everything.
    #[must_use]
    pub fn new(max_calls: u32, window: Duration, idle: Duration) -> Self {
        Self {
            max_calls,
            window,
            idle,
            windows: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(config.max_calls, config.window(), config.idle())
    }

    /// Admit or reject one call for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::RateLimited`] once `key` has used its calls
    /// for the current window.
    pub fn check(&self, key: &str) -> Result<(), ThrottleError> {
        self.check_at(key, Instant::now())
    }

    /// [`RateLimiter::check`] at an explicit instant.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError::RateLimited`] when the window is exhausted.
    pub fn check_at(&self, key: &str, now: Instant) -> Result<(), ThrottleError> {
        if self.max_calls == 0 {
            return Ok(());
        }

        let mut windows = lock(&self.windows);
        let window = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
            last_seen: now,
        });
        window.last_seen = now;

        let elapsed = now.saturating_duration_since(window.started);
        if elapsed >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.max_calls {
            let retry_after = self.window.saturating_sub(elapsed);
            tracing::warn!(key, ?retry_after, "rate limit exceeded");
            return Err(ThrottleError::RateLimited {
                key: key.to_string(),
                retry_after,
            });
        }

        window.count += 1;
        Ok(())
    }

    /// Calls left for `key` in its current window.
    #[must_use]
    pub fn remaining_at(&self, key: &str, now: Instant) -> u32 {
        let windows = lock(&self.windows);
        match windows.get(key) {
            Some(window) if now.saturating_duration_since(window.started) < self.window => {
                self.max_calls.saturating_sub(window.count)
            }
            _ => self.max_calls,
        }
    }

    /// Forget `key`'s window.
    pub fn reset(&self, key: &str) {
        lock(&self.windows).remove(key);
    }

    /// Drop keys not seen for longer than the idle period. Returns the number
    /// removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = lock(&self.windows);
        let before = windows.len();
        windows.retain(|_, window| now.saturating_duration_since(window.last_seen) <= self.idle);
        before - windows.len()
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        lock(&self.windows).len()
    }
}

/// Trailing-edge debouncer: a key fires once it has been quiet for the
/// configured period.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    last: Mutex<HashMap<String, Instant>>,
}

impl Debouncer {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            last: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(config.debounce())
    }

    /// Record an invocation of `key`, restarting its quiet period.
    pub fn touch_at(&self, key: &str, now: Instant) {
        lock(&self.last).insert(key.to_string(), now);
    }

    pub fn touch(&self, key: &str) {
        self.touch_at(key, Instant::now());
    }

    /// Whether `key` is pending and has been quiet long enough.
    #[must_use]
    pub fn ready_at(&self, key: &str, now: Instant) -> bool {
        lock(&self.last)
            .get(key)
            .is_some_and(|&touched| now.saturating_duration_since(touched) >= self.quiet)
    }

    /// Remove and return every ready key, sorted.
    pub fn take_ready_at(&self, now: Instant) -> Vec<String> {
        let mut last = lock(&self.last);
        let mut ready: Vec<String> = last
            .iter()
            .filter(|&(_, &touched)| now.saturating_duration_since(touched) >= self.quiet)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &ready {
            last.remove(key);
        }
        ready.sort();
        ready
    }

    pub fn take_ready(&self) -> Vec<String> {
        self.take_ready_at(Instant::now())
    }

    /// Drop pending keys older than `max_age` without firing them.
    pub fn sweep_at(&self, now: Instant, max_age: Duration) -> usize {
        let mut last = lock(&self.last);
        let before = last.len();
        last.retain(|_, touched| now.saturating_duration_since(*touched) <= max_age);
        before - last.len()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.last).len()
    }
}

/// Exponential backoff schedule for [`retry_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. `0` is treated as `1`.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Add up to 25% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1` (so `attempt` failures so
    /// far, starting at 0): `min(base * 2^attempt, max)`, plus jitter, capped
    /// at `max`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if !self.jitter {
            return delay;
        }

        let spread = u64::try_from(delay.as_millis() / 4).unwrap_or(u64::MAX);
        let extra = rand::thread_rng().gen_range(0..=spread);
        (delay + Duration::from_millis(extra)).min(self.max_delay)
    }

    /// Delays between attempts, without jitter.
    #[must_use]
    pub fn schedule(&self) -> Vec<Duration> {
        let plain = Self {
            jitter: false,
            ..*self
        };
        (0..self.attempts().saturating_sub(1))
            .map(|attempt| plain.delay_for(attempt))
            .collect()
    }

    const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }
}

/// Failure from [`retry_with`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },
    /// An attempt failed with an error the predicate refused to retry.
    #[error("attempt {attempt} failed and is not retryable: {error}")]
    Aborted {
        attempt: u32,
        #[source]
        error: E,
    },
}

impl<E> RetryError<E> {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Exhausted { .. } => ErrorCode::RetryExhausted,
            Self::Aborted { .. } => ErrorCode::InternalUnexpected,
        }
    }

    /// The error from the final attempt.
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::Aborted { error, .. } => error,
        }
    }
}

/// Run `op` until it succeeds, fails with an error `is_retryable` rejects, or
/// the policy's attempts run out. `op` receives the 1-based attempt number.
/// `sleep` is called between attempts with the backoff delay.
///
/// # Errors
///
/// Returns [`RetryError::Aborted`] for a non-retryable failure and
/// [`RetryError::Exhausted`] when every attempt failed.
pub fn retry_with<T, E, Op, Retryable, Sleep>(
    policy: &RetryPolicy,
    is_retryable: Retryable,
    mut sleep: Sleep,
    mut op: Op,
) -> Result<T, RetryError<E>>
where
    Op: FnMut(u32) -> Result<T, E>,
    Retryable: Fn(&E) -> bool,
    Sleep: FnMut(Duration),
    E: fmt::Display,
{
    let attempts = policy.attempts();
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(error) if !is_retryable(&error) => {
                return Err(RetryError::Aborted { attempt, error });
            }
            Err(error) if attempt >= attempts => {
                tracing::warn!(attempts, %error, "retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }
            Err(error) => {
                let delay = policy.delay_for(attempt - 1);
                tracing::warn!(attempt, ?delay, %error, "attempt failed, backing off");
                sleep(delay);
                attempt += 1;
            }
        }
    }
}

/// [`retry_with`] that blocks the current thread between attempts.
///
/// # Errors
///
/// See [`retry_with`].
pub fn retry<T, E, Op, Retryable>(
    policy: &RetryPolicy,
    is_retryable: Retryable,
    op: Op,
) -> Result<T, RetryError<E>>
where
    Op: FnMut(u32) -> Result<T, E>,
    Retryable: Fn(&E) -> bool,
    E: fmt::Display,
{
    retry_with(policy, is_retryable, std::thread::sleep, op)
}

/// The throttling state one application instance owns.
#[derive(Debug)]
pub struct ThrottleContext {
    pub limiter: RateLimiter,
    pub debouncer: Debouncer,
    pub retry: RetryPolicy,
    idle: Duration,
}

impl ThrottleContext {
    #[must_use]
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            limiter: RateLimiter::from_config(&config.throttle),
            debouncer: Debouncer::from_config(&config.throttle),
            retry: RetryPolicy::from(&config.retry),
            idle: config.throttle.idle(),
        }
    }

    /// Sweep idle limiter windows and abandoned debounce keys. Returns the
    /// number of entries removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let removed = self.limiter.sweep_at(now) + self.debouncer.sweep_at(now, self.idle);
        if removed > 0 {
            tracing::debug!(removed, "swept idle throttle entries");
        }
        removed
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }
}

impl Default for ThrottleContext {
    fn default() -> Self {
        Self::from_config(&ProjectConfig::default())
    }
}
