//! Token bucket rate limiter.
//!
//! A bucket holds at most `burst` tokens and refills continuously at `rate`
//! tokens per second. Each admitted event consumes one token.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed to proceed.
    Allowed {
        /// Bucket capacity
        limit: u32,
        /// Whole tokens left after this request
        remaining: u32,
    },
    /// Request is rate limited and should be rejected.
    Limited {
        /// Bucket capacity
        limit: u32,
        /// Time until the next token becomes available
        reset_after: Duration,
    },
}

impl RateLimitResult {
    /// Returns true if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Get the limit value.
    pub fn limit(&self) -> u32 {
        match self {
            RateLimitResult::Allowed { limit, .. } => *limit,
            RateLimitResult::Limited { limit, .. } => *limit,
        }
    }

    /// Get the remaining count (always 0 when limited).
    pub fn remaining(&self) -> u32 {
        match self {
            RateLimitResult::Allowed { remaining, .. } => *remaining,
            RateLimitResult::Limited { .. } => 0,
        }
    }

    /// Get the reset duration if limited.
    pub fn reset_after(&self) -> Option<Duration> {
        match self {
            RateLimitResult::Limited { reset_after, .. } => Some(*reset_after),
            RateLimitResult::Allowed { .. } => None,
        }
    }
}

/// Parameters shared by every bucket of a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketParams {
    /// Tokens refilled per second
    pub rate: f64,
    /// Maximum tokens held at once
    pub burst: u32,
}

impl BucketParams {
    /// A negative or NaN `rate` is treated as 0, a bucket that never refills.
    pub fn new(rate: f64, burst: u32) -> Self {
        Self {
            rate: rate.max(0.0),
            burst,
        }
    }
}

impl From<&RateLimitConfig> for BucketParams {
    fn from(cfg: &RateLimitConfig) -> Self {
        Self::new(cfg.requests_per_second, cfg.burst)
    }
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket that is safe to share between tasks.
///
/// The state lock is held only for the few arithmetic operations of a check,
/// so concurrent checks on the same bucket never lose a decrement and checks
/// on different buckets never contend.
///
/// # Example
/// ```ignore
/// use tollgate_lib::security::rate_limit::{BucketParams, TokenBucket};
///
/// let bucket = TokenBucket::new(BucketParams::new(2.0, 4));
/// assert!(bucket.allow());
/// ```
pub struct TokenBucket {
    params: BucketParams,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(params: BucketParams) -> Self {
        Self::new_at(params, Instant::now())
    }

    /// Create a full bucket whose refill clock starts at `now`.
    pub fn new_at(params: BucketParams, now: Instant) -> Self {
        Self {
            params,
            state: Mutex::new(BucketState {
                tokens: f64::from(params.burst),
                last_refill: now,
            }),
        }
    }

    /// Consume one token if available.
    pub fn allow(&self) -> bool {
        self.check().is_allowed()
    }

    /// Consume one token at `now` if available.
    pub fn allow_at(&self, now: Instant) -> bool {
        self.check_at(now).is_allowed()
    }

    /// Try to consume one token and describe the outcome.
    pub fn check(&self) -> RateLimitResult {
        self.check_at(Instant::now())
    }

    pub fn check_at(&self, now: Instant) -> RateLimitResult {
        let mut state = self.lock();
        self.refill(&mut state, now);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            RateLimitResult::Allowed {
                limit: self.params.burst,
                remaining: state.tokens as u32,
            }
        } else {
            let deficit = 1.0 - state.tokens;
            // a tiny rate can put the wait beyond what Duration holds
            let reset_after = if self.params.rate > 0.0 {
                Duration::try_from_secs_f64(deficit / self.params.rate).unwrap_or(Duration::MAX)
            } else {
                Duration::MAX
            };
            RateLimitResult::Limited {
                limit: self.params.burst,
                reset_after,
            }
        }
    }

    /// Tokens currently available (after refilling up to now).
    pub fn available(&self) -> f64 {
        self.available_at(Instant::now())
    }

    pub fn available_at(&self, now: Instant) -> f64 {
        let mut state = self.lock();
        self.refill(&mut state, now);
        state.tokens
    }

    pub fn params(&self) -> BucketParams {
        self.params
    }

    // a caller holding an older `now` than the last refill gets no extra tokens
    fn refill(&self, state: &mut BucketState, now: Instant) {
        if now <= state.last_refill {
            return;
        }
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        let capacity = f64::from(self.params.burst);
        state.tokens = (state.tokens + elapsed * self.params.rate).min(capacity);
        state.last_refill = now;
    }

    fn lock(&self) -> MutexGuard<'_, BucketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for TokenBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucket")
            .field("params", &self.params)
            .field("tokens", &self.lock().tokens)
            .finish()
    }
}
