//! Token-bucket rate limiting consulted before every physical send.
//!
//! The API throttles aggressively and degrades under bursts, so callers wait for a token before
//! each attempt. A [`RateLimiter`] is an explicit value: share one `Arc<RateLimiter>` between
//! clients to bound their combined rate, or give each client its own.

// crates.io
use tokio::time::Instant;
// self
use crate::{_prelude::*, context::CallContext, error::ConfigError};

/// Token bucket with a sustained rate and a burst capacity.
#[derive(Debug)]
pub struct RateLimiter {
	limit: Option<Limit>,
	bucket: Mutex<Bucket>,
}
impl RateLimiter {
	/// Sustained rate the API tolerates in practice.
	pub const DEFAULT_RATE: f64 = 8.0;
	/// Burst size above which concurrent workers start seeing 503s.
	pub const DEFAULT_BURST: u32 = 15;

	/// Creates a limiter refilling `rate` tokens per second up to `burst` tokens.
	pub fn new(rate: f64, burst: u32) -> Result<Self, ConfigError> {
		if !(rate.is_finite() && rate > 0.0) || burst == 0 {
			return Err(ConfigError::InvalidRateLimit { rate, burst });
		}

		Ok(Self {
			limit: Some(Limit { rate, burst: f64::from(burst) }),
			bucket: Mutex::new(Bucket { tokens: f64::from(burst), updated_at: Instant::now() }),
		})
	}

	/// Creates a limiter that never waits.
	pub fn unlimited() -> Self {
		Self { limit: None, bucket: Mutex::new(Bucket { tokens: 0., updated_at: Instant::now() }) }
	}

	/// Returns the sustained rate in tokens per second (`None` when unlimited).
	pub fn rate(&self) -> Option<f64> {
		self.limit.map(|limit| limit.rate)
	}

	/// Returns the burst capacity (`None` when unlimited).
	pub fn burst(&self) -> Option<u32> {
		self.limit.map(|limit| limit.burst as u32)
	}

	/// Waits until a token is available, aborting if `ctx` is cancelled first.
	///
	/// The token is reserved up front, so concurrent waiters are served in arrival order; a
	/// cancelled waiter hands its reservation back.
	pub async fn wait(&self, ctx: &CallContext) -> Result<()> {
		ctx.check()?;

		let Some(limit) = self.limit else {
			return Ok(());
		};
		let delay = self.reserve(limit, Instant::now());

		if delay.is_zero() {
			return Ok(());
		}

		ctx.sleep(delay).await.inspect_err(|_| self.release(limit))
	}

	/// Takes a token if one is available right now.
	pub fn try_acquire(&self) -> bool {
		let Some(limit) = self.limit else {
			return true;
		};
		let mut bucket = self.bucket.lock();

		bucket.refill(limit, Instant::now());

		if bucket.tokens >= 1. {
			bucket.tokens -= 1.;

			true
		} else {
			false
		}
	}

	/// Returns the whole tokens currently available (`None` when unlimited).
	pub fn available(&self) -> Option<u32> {
		let limit = self.limit?;
		let mut bucket = self.bucket.lock();

		bucket.refill(limit, Instant::now());

		Some(bucket.tokens.max(0.).floor() as u32)
	}

	fn reserve(&self, limit: Limit, now: Instant) -> StdDuration {
		let mut bucket = self.bucket.lock();

		bucket.refill(limit, now);
		bucket.tokens -= 1.;

		if bucket.tokens >= 0. {
			StdDuration::ZERO
		} else {
			// Tiny rates can push the wait past what a duration holds.
			StdDuration::try_from_secs_f64(-bucket.tokens / limit.rate).unwrap_or(StdDuration::MAX)
		}
	}

	fn release(&self, limit: Limit) {
		let mut bucket = self.bucket.lock();

		bucket.tokens = (bucket.tokens + 1.).min(limit.burst);
	}
}
impl Default for RateLimiter {
	fn default() -> Self {
		Self {
			limit: Some(Limit { rate: Self::DEFAULT_RATE, burst: f64::from(Self::DEFAULT_BURST) }),
			bucket: Mutex::new(Bucket {
				tokens: f64::from(Self::DEFAULT_BURST),
				updated_at: Instant::now(),
			}),
		}
	}
}

#[derive(Clone, Copy, Debug)]
struct Limit {
	rate: f64,
	burst: f64,
}

#[derive(Debug)]
struct Bucket {
	// Negative while waiters hold reservations.
	tokens: f64,
	updated_at: Instant,
}
impl Bucket {
	fn refill(&mut self, limit: Limit, now: Instant) {
		let elapsed = now.saturating_duration_since(self.updated_at).as_secs_f64();

		self.tokens = (self.tokens + elapsed * limit.rate).min(limit.burst);
		self.updated_at = now;
	}
}
