//! Observer contracts the client invokes around sends and refreshes.
//!
//! Observers are side-effecting hooks only: they see requests, throttled responses, and
//! refreshed credentials, but cannot alter control flow. Closures implement each trait
//! directly, so `ClientBuilder::on_outgoing_request(|req| ...)` works without a wrapper type.

// self
use crate::{
	_prelude::*,
	auth::OAuthCredentials,
	error::BoxError,
	request::{PreparedRequest, RawResponse},
};

/// Called right before each physical attempt is handed to the transport.
pub trait RequestObserver
where
	Self: Send + Sync,
{
	/// Observes the attempt about to be sent.
	fn on_outgoing_request(&self, request: &PreparedRequest);
}
impl<F> RequestObserver for F
where
	F: Fn(&PreparedRequest) + Send + Sync,
{
	fn on_outgoing_request(&self, request: &PreparedRequest) {
		self(request)
	}
}

/// Called when the server answers an attempt with HTTP 503 and the executor backs off.
pub trait RateLimitObserver
where
	Self: Send + Sync,
{
	/// Observes the throttled attempt and the response that throttled it.
	fn on_rate_limited(&self, request: &PreparedRequest, response: &RawResponse);
}
impl<F> RateLimitObserver for F
where
	F: Fn(&PreparedRequest, &RawResponse) + Send + Sync,
{
	fn on_rate_limited(&self, request: &PreparedRequest, response: &RawResponse) {
		self(request, response)
	}
}

/// Called after every successful credential refresh, typically to persist the new tokens.
///
/// Errors are logged and otherwise ignored: the refresh already took effect in memory.
pub trait RefreshObserver
where
	Self: Send + Sync,
{
	/// Receives a copy of the credentials now in use.
	fn on_refresh(&self, credentials: OAuthCredentials) -> Result<(), BoxError>;
}
impl<F> RefreshObserver for F
where
	F: Fn(OAuthCredentials) -> Result<(), BoxError> + Send + Sync,
{
	fn on_refresh(&self, credentials: OAuthCredentials) -> Result<(), BoxError> {
		self(credentials)
	}
}

/// Optional observers attached to a client.
#[derive(Clone, Default)]
pub struct Observers {
	/// Pre-send hook.
	pub outgoing_request: Option<Arc<dyn RequestObserver>>,
	/// 503 hook.
	pub rate_limited: Option<Arc<dyn RateLimitObserver>>,
}
impl Observers {
	pub(crate) fn outgoing(&self, request: &PreparedRequest) {
		if let Some(observer) = &self.outgoing_request {
			observer.on_outgoing_request(request);
		}
	}

	pub(crate) fn throttled(&self, request: &PreparedRequest, response: &RawResponse) {
		if let Some(observer) = &self.rate_limited {
			observer.on_rate_limited(request, response);
		}
	}
}
impl Debug for Observers {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Observers")
			.field("outgoing_request", &self.outgoing_request.is_some())
			.field("rate_limited", &self.rate_limited.is_some())
			.finish()
	}
}
