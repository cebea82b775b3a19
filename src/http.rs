//! Transport primitives for API calls.
//!
//! The module exposes [`ApiTransport`], the client's only dependency on an HTTP stack. The
//! executor hands it one [`PreparedRequest`] per physical attempt and expects a fully-buffered
//! [`RawResponse`] back; connection pooling, TLS and proxies stay the transport's business.
//! Failures must be reported as [`TransportError`] so the executor can tell the transient
//! handshake-timeout signature apart from fatal network errors.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// self
use crate::{
	_prelude::*,
	error::TransportError,
	request::{PreparedRequest, RawResponse},
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, request::Method};

/// Boxed future returned by [`ApiTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of dispatching prepared API requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can back many clients, and
/// the returned future must be `Send` so calls can hop executors. Implementations should read
/// the whole body before resolving; the executor never streams.
pub trait ApiTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends one attempt and buffers its response.
	fn send(&self, request: PreparedRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	const CONNECT_TIMEOUT: StdDuration = StdDuration::from_secs(30);
	const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(90);

	/// Builds a transport with connect and overall timeouts suited to the API.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.connect_timeout(Self::CONNECT_TIMEOUT)
			.timeout(Self::REQUEST_TIMEOUT)
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiTransport for ReqwestTransport {
	fn send(&self, request: PreparedRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
			};
			let mut builder = self.0.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(*name, value);
			}
			if let Some(body) = &request.body {
				builder = builder.body(body.as_str().to_owned());
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let url = response.url().clone();
			let body = response.bytes().await?;

			Ok(RawResponse { status, url, body: Some(body.to_vec()) })
		})
	}
}
