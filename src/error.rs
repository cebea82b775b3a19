//! Client-level error types shared across the executor, token manager, and decoder.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error used where a collaborator's concrete error type is erased.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Structured failure reported by the API in its `errors` list.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Response body could not be read as the expected shape.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// Non-2xx response carrying no structured error messages.
	#[error("Server error: HTTP {status} for {path}.")]
	HttpStatus {
		/// HTTP status code.
		status: u16,
		/// Request path the status was returned for.
		path: String,
	},
	/// The credential refresh call failed; the triggering call cannot proceed.
	#[error("OAuth token refresh failed.")]
	Refresh {
		/// Classified failure of the refresh call itself.
		#[source]
		source: Box<Error>,
	},
	/// A suspension point observed cancellation or an expired deadline.
	#[error("Call aborted: {0}.")]
	Cancelled(CancelReason),
}
impl Error {
	/// Wraps a refresh-call failure.
	pub fn refresh(source: Error) -> Self {
		Self::Refresh { source: Box::new(source) }
	}

	/// Returns `true` when the server answered with structured error messages.
	pub fn is_api(&self) -> bool {
		self.api_error().is_some()
	}

	/// Returns the structured API error, looking through refresh failures.
	pub fn api_error(&self) -> Option<&ApiError> {
		match self {
			Self::Api(err) => Some(err),
			Self::Refresh { source } => source.api_error(),
			_ => None,
		}
	}

	/// Returns the HTTP status carried by the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Api(err) => Some(err.status),
			Self::HttpStatus { status, .. } => Some(*status),
			Self::Refresh { source } => source.status(),
			_ => None,
		}
	}

	/// Returns `true` if the call was aborted by its [`CallContext`](crate::context::CallContext).
	pub fn is_cancelled(&self) -> bool {
		match self {
			Self::Cancelled(_) => true,
			Self::Refresh { source } => source.is_cancelled(),
			_ => false,
		}
	}
}

/// Why a suspended call was aborted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
	/// The caller's cancellation token fired.
	Cancelled,
	/// The call's deadline elapsed.
	DeadlineExceeded,
}
impl Display for CancelReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Cancelled => f.write_str("cancelled by caller"),
			Self::DeadlineExceeded => f.write_str("deadline exceeded"),
		}
	}
}

/// Structured error returned by the API (`{"errors": [...]}`).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("itch.io API error (HTTP {status}) for {path}: {}", .messages.join(", "))]
pub struct ApiError {
	/// HTTP status code of the response.
	pub status: u16,
	/// Request path the error was returned for.
	pub path: String,
	/// Server-reported messages, in order.
	pub messages: Vec<String>,
}

/// Configuration and validation failures raised while building a client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Server or endpoint URL cannot be parsed.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending input.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The builder was not given an API key or OAuth credentials.
	#[error("Client needs either an API key or OAuth credentials.")]
	MissingCredential,
	/// OAuth clients need a client identifier for refresh grants.
	#[error("OAuth client identifier must not be empty.")]
	MissingClientId,
	/// Rate limiter parameters are out of range.
	#[error("Rate limit must allow at least one request (rate {rate}/s, burst {burst}).")]
	InvalidRateLimit {
		/// Sustained rate in requests per second.
		rate: f64,
		/// Burst capacity.
		burst: u32,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The TLS handshake did not complete in time; safe to retry.
	#[error("TLS handshake timed out.")]
	HandshakeTimeout {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error, recognizing handshake timeouts by message.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		if mentions_handshake_timeout(&src) {
			Self::HandshakeTimeout { source: Box::new(src) }
		} else {
			Self::Network { source: Box::new(src) }
		}
	}

	/// Wraps an error the transport already classified as a handshake timeout.
	pub fn handshake_timeout(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HandshakeTimeout { source: Box::new(src) }
	}

	/// Returns `true` for the failure signatures the executor retries.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::HandshakeTimeout { .. })
	}
}
/// Only a handshake timeout named somewhere in the error chain is transient; a bare connect
/// timeout (e.g. an unreachable host) fails the call immediately.
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Failures turning a raw response into a typed value.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// No response (or no body) was available to decode.
	#[error("No response from server.")]
	MissingBody,
	/// Body is not a JSON object.
	#[error("JSON decode error: {source}. Body: {body}")]
	Json {
		/// Parser failure.
		#[source]
		source: serde_json::Error,
		/// Raw body, lossily converted to UTF-8.
		body: String,
	},
	/// Normalized document does not fit the destination type.
	#[error("Response does not match the expected shape at `{}`: {}. Document: {document}", .source.path(), .source.inner())]
	Shape {
		/// Failure annotated with the offending field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// Normalized (camelCased) document that failed to decode.
		document: String,
	},
}

fn mentions_handshake_timeout(err: &(dyn StdError + 'static)) -> bool {
	let mut current = Some(err);

	while let Some(inner) = current {
		let message = inner.to_string().to_ascii_lowercase();

		if message.contains("handshake")
			&& (message.contains("timeout") || message.contains("timed out"))
		{
			return true;
		}

		current = inner.source();
	}

	false
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Debug)]
	struct Message(&'static str);
	impl Display for Message {
		fn fmt(&self, f: &mut Formatter) -> FmtResult {
			f.write_str(self.0)
		}
	}
	impl StdError for Message {}

	#[test]
	fn handshake_timeouts_are_transient() {
		let transient = TransportError::network(Message("net/http: TLS handshake timeout"));
		let fatal = TransportError::network(Message("connection refused"));

		assert!(transient.is_transient());
		assert!(!fatal.is_transient());
		assert!(TransportError::handshake_timeout(Message("deadline elapsed")).is_transient());
	}

	#[derive(Debug)]
	struct Wrapped {
		message: &'static str,
		source: Message,
	}
	impl Display for Wrapped {
		fn fmt(&self, f: &mut Formatter) -> FmtResult {
			f.write_str(self.message)
		}
	}
	impl StdError for Wrapped {
		fn source(&self) -> Option<&(dyn StdError + 'static)> {
			Some(&self.source)
		}
	}

	#[test]
	fn handshake_timeouts_are_found_in_the_error_chain() {
		let nested = TransportError::network(Wrapped {
			message: "error sending request",
			source: Message("TLS handshake timed out"),
		});
		let connect = TransportError::network(Wrapped {
			message: "error sending request",
			source: Message("connection timed out"),
		});

		assert!(nested.is_transient());
		assert!(!connect.is_transient());
	}

	#[cfg(feature = "reqwest")]
	#[tokio::test]
	async fn reqwest_connect_failures_are_not_transient() {
		let client = ReqwestClient::builder()
			.connect_timeout(StdDuration::from_millis(1))
			.build()
			.expect("Reqwest client should build.");
		let err = client
			.get("http://10.255.255.1/")
			.send()
			.await
			.expect_err("Unroutable host should fail to connect.");

		assert!(!TransportError::from(err).is_transient());
	}

	#[test]
	fn api_error_is_visible_through_refresh_failures() {
		let api = ApiError {
			status: 400,
			path: "/oauth/token".into(),
			messages: vec!["invalid refresh token".into()],
		};
		let err = Error::refresh(api.clone().into());

		assert!(err.is_api());
		assert_eq!(err.api_error(), Some(&api));
		assert_eq!(err.status(), Some(400));
		assert_eq!(
			api.to_string(),
			"itch.io API error (HTTP 400) for /oauth/token: invalid refresh token"
		);
	}
}
