//! Per-call cancellation and deadline handling.
//!
//! Every operation that can suspend (rate limiter waits, backoff sleeps, waiting on the refresh
//! lock, and the transport round-trip) takes a [`CallContext`] and races its future against the
//! context's cancellation token and deadline. Whichever fires first aborts the call with
//! [`Error::Cancelled`].

// crates.io
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, error::CancelReason};

/// Cancellation signal and optional deadline shared by every suspension point of one call.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
	cancel: CancellationToken,
	deadline: Option<Instant>,
}
impl CallContext {
	/// Creates a context that never expires and is only cancelled explicitly.
	pub fn new() -> Self {
		Self::default()
	}

	/// Uses an existing cancellation token (e.g. a child of a service-wide shutdown token).
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancel = token;

		self
	}

	/// Sets the deadline to `timeout` from now.
	pub fn with_timeout(self, timeout: StdDuration) -> Self {
		self.with_deadline(Instant::now() + timeout)
	}

	/// Sets an absolute deadline; an earlier existing deadline is kept.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(match self.deadline {
			Some(existing) if existing < deadline => existing,
			_ => deadline,
		});

		self
	}

	/// Returns the cancellation token driving this context.
	pub fn cancellation_token(&self) -> &CancellationToken {
		&self.cancel
	}

	/// Returns the deadline, if one was set.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Cancels the context; pending and future suspensions abort.
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Fails fast if the context is already cancelled or past its deadline.
	pub fn check(&self) -> Result<()> {
		if self.cancel.is_cancelled() {
			return Err(Error::Cancelled(CancelReason::Cancelled));
		}
		if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
			return Err(Error::Cancelled(CancelReason::DeadlineExceeded));
		}

		Ok(())
	}

	/// Drives `fut` to completion unless the context is cancelled or its deadline passes first.
	pub async fn run<F>(&self, fut: F) -> Result<F::Output>
	where
		F: Future,
	{
		self.check()?;

		let deadline = self.deadline;
		let expired = async move {
			match deadline {
				Some(deadline) => time::sleep_until(deadline).await,
				None => std::future::pending::<()>().await,
			}
		};

		tokio::select! {
			biased;

			_ = self.cancel.cancelled() => Err(Error::Cancelled(CancelReason::Cancelled)),
			_ = expired => Err(Error::Cancelled(CancelReason::DeadlineExceeded)),
			output = fut => Ok(output),
		}
	}

	/// Sleeps for `duration`, aborting early on cancellation or deadline.
	pub async fn sleep(&self, duration: StdDuration) -> Result<()> {
		if duration.is_zero() {
			return self.check();
		}

		self.run(time::sleep(duration)).await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn sleep_completes_without_signal() {
		let ctx = CallContext::new();

		ctx.sleep(StdDuration::from_secs(5)).await.expect("Uncancelled sleep should complete.");
	}

	#[tokio::test(start_paused = true)]
	async fn deadline_aborts_sleep() {
		let ctx = CallContext::new().with_timeout(StdDuration::from_secs(1));
		let err = ctx
			.sleep(StdDuration::from_secs(30))
			.await
			.expect_err("Sleep past the deadline should abort.");

		assert!(matches!(err, Error::Cancelled(CancelReason::DeadlineExceeded)));
	}

	#[tokio::test(start_paused = true)]
	async fn cancellation_aborts_pending_future() {
		let ctx = CallContext::new();
		let canceller = ctx.clone();

		tokio::spawn(async move {
			time::sleep(StdDuration::from_millis(10)).await;
			canceller.cancel();
		});

		let err = ctx
			.run(std::future::pending::<()>())
			.await
			.expect_err("Cancellation should abort a pending future.");

		assert!(matches!(err, Error::Cancelled(CancelReason::Cancelled)));
	}

	#[test]
	fn earlier_deadline_wins() {
		let now = Instant::now();
		let ctx = CallContext::new()
			.with_deadline(now + StdDuration::from_secs(1))
			.with_deadline(now + StdDuration::from_secs(60));

		assert_eq!(ctx.deadline(), Some(now + StdDuration::from_secs(1)));
	}
}
