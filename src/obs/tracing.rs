// self
use crate::{
	_prelude::*,
	obs::CallKind,
	request::{PreparedRequest, RawResponse},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by the executor and the token manager.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("itchio_api.call", kind = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs one physical attempt right before it reaches the transport.
pub fn attempt_started(request: &PreparedRequest) {
	#[cfg(feature = "tracing")]
	tracing::debug!(
		method = request.method.as_str(),
		url = request.url.as_str(),
		attempt = request.attempt,
		"sending API request"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = request;
}

/// Logs a received response; bodies are only dumped at `trace` level.
pub fn response_received(response: &RawResponse, attempt: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(status = response.status, path = response.path(), attempt, "received API response");

		if tracing::enabled!(tracing::Level::TRACE) {
			let body = response.body.as_deref().map(String::from_utf8_lossy).unwrap_or_default();

			tracing::trace!(status = response.status, body = %body, "API response body");
		}
	}
	#[cfg(not(feature = "tracing"))]
	let _ = (response, attempt);
}

/// Logs a backoff before the next attempt.
pub fn backoff_scheduled(request: &PreparedRequest, reason: &'static str, delay: StdDuration) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		method = request.method.as_str(),
		path = request.url.path(),
		attempt = request.attempt,
		reason,
		delay_ms = delay.as_millis() as u64,
		"retrying API request after backoff"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (request, reason, delay);
}

/// Logs the resend that follows a reactive refresh.
pub fn resend_after_refresh(request: &PreparedRequest) {
	#[cfg(feature = "tracing")]
	tracing::info!(
		method = request.method.as_str(),
		path = request.url.path(),
		"credential rejected, resending with refreshed token"
	);
	#[cfg(not(feature = "tracing"))]
	let _ = request;
}

/// Logs a failing refresh observer; the failure is never propagated.
pub fn refresh_observer_failed(err: &(dyn StdError + Send + Sync)) {
	#[cfg(feature = "tracing")]
	tracing::warn!(error = %err, "refresh observer failed; credentials stay updated in memory");
	#[cfg(not(feature = "tracing"))]
	let _ = err;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = CallSpan::new(CallKind::Refresh, "instrument_wraps_future");
		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
