//! Backoff schedule and the per-call attempt loop.

// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	client::Client,
	context::CallContext,
	http::ApiTransport,
	obs::{self, CallKind, CallOutcome},
	request::{ApiRequest, PreparedRequest, RawResponse},
};

/// Backoff schedule applied to 503 responses and transient transport failures.
///
/// A policy with `n` backoffs allows `n + 1` physical attempts per logical call: the backoffs
/// separate consecutive attempts and the final attempt is never followed by a sleep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	backoffs: Vec<StdDuration>,
	max_jitter: StdDuration,
}
impl RetryPolicy {
	/// Upper bound of the random jitter added to every backoff by default.
	pub const DEFAULT_MAX_JITTER: StdDuration = StdDuration::from_millis(1_000);

	/// Creates a policy from explicit backoffs with the default jitter.
	pub fn new(backoffs: Vec<StdDuration>) -> Self {
		Self { backoffs, max_jitter: Self::DEFAULT_MAX_JITTER }
	}

	/// Creates a policy that sends each call exactly once.
	pub fn no_retry() -> Self {
		Self::new(Vec::new())
	}

	/// Overrides the jitter bound; zero disables jitter.
	pub fn with_max_jitter(mut self, max_jitter: StdDuration) -> Self {
		self.max_jitter = max_jitter;

		self
	}

	/// Returns the configured backoffs.
	pub fn backoffs(&self) -> &[StdDuration] {
		&self.backoffs
	}

	/// Returns the jitter bound.
	pub fn max_jitter(&self) -> StdDuration {
		self.max_jitter
	}

	/// Returns the number of physical attempts a call may make.
	pub fn attempts(&self) -> usize {
		self.backoffs.len() + 1
	}

	/// Returns the sleep that follows the one-based `attempt`, jitter included.
	///
	/// Returns `None` for the final attempt.
	pub fn delay_after(&self, attempt: usize) -> Option<StdDuration> {
		let base = *self.backoffs.get(attempt.checked_sub(1)?)?;

		if self.max_jitter.is_zero() {
			return Some(base);
		}

		Some(base + rand::rng().random_range(StdDuration::ZERO..=self.max_jitter))
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::new([1, 2, 4, 8, 16].into_iter().map(StdDuration::from_secs).collect())
	}
}

/// The last physical attempt of a call and what the server answered.
pub(crate) struct Attempted {
	pub(crate) request: PreparedRequest,
	pub(crate) response: RawResponse,
}

impl<T> Client<T>
where
	T: ?Sized + ApiTransport,
{
	/// Runs `request` through the limiter and the backoff schedule until it yields a response
	/// that needs no retry, a fatal error, or the schedule runs out.
	pub(crate) async fn execute(
		&self,
		ctx: &CallContext,
		request: &ApiRequest,
		kind: CallKind,
	) -> Result<Attempted> {
		let attempts = self.retry.attempts();
		let mut attempt = 0;

		loop {
			attempt += 1;

			self.limiter.wait(ctx).await?;

			let prepared = self.prepare(request, attempt);
			let last = attempt >= attempts;

			self.observers.outgoing(&prepared);
			obs::attempt_started(&prepared);

			match ctx.run(self.transport.send(prepared.clone())).await? {
				Ok(response) => {
					obs::response_received(&response, attempt);

					if response.status == 503 {
						self.observers.throttled(&prepared, &response);

						if !last {
							self.backoff(ctx, &prepared, "service_unavailable", kind).await?;

							continue;
						}
					}

					return Ok(Attempted { request: prepared, response });
				},
				Err(err) if err.is_transient() && !last => {
					self.backoff(ctx, &prepared, "handshake_timeout", kind).await?;
				},
				Err(err) => return Err(err.into()),
			}
		}
	}

	async fn backoff(
		&self,
		ctx: &CallContext,
		request: &PreparedRequest,
		reason: &'static str,
		kind: CallKind,
	) -> Result<()> {
		let delay = self.retry.delay_after(request.attempt).unwrap_or_default();

		obs::backoff_scheduled(request, reason, delay);
		obs::record_call_outcome(kind, CallOutcome::Retry);

		ctx.sleep(delay).await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn default_schedule_doubles_from_one_second() {
		let policy = RetryPolicy::default().with_max_jitter(StdDuration::ZERO);

		assert_eq!(policy.attempts(), 6);
		assert_eq!(policy.delay_after(1), Some(StdDuration::from_secs(1)));
		assert_eq!(policy.delay_after(5), Some(StdDuration::from_secs(16)));
		assert_eq!(policy.delay_after(6), None);
		assert_eq!(policy.delay_after(0), None);
	}

	#[test]
	fn jitter_stays_within_bound() {
		let policy = RetryPolicy::new(vec![StdDuration::from_secs(2)]);

		for _ in 0..100 {
			let delay = policy.delay_after(1).expect("First attempt should have a backoff.");

			assert!(delay >= StdDuration::from_secs(2));
			assert!(delay <= StdDuration::from_secs(3));
		}
	}

	#[test]
	fn no_retry_allows_a_single_attempt() {
		assert_eq!(RetryPolicy::no_retry().attempts(), 1);
	}
}
