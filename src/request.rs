//! Request descriptors and the wire-level request/response shapes handed to transports.
//!
//! An [`ApiRequest`] is what callers (and endpoint builders) produce: a method, a URL that
//! already carries its query string, and an optional form body. The body is encoded exactly
//! once when the descriptor is built, so every attempt the executor makes (backoff retries and
//! the post-refresh resend alike) ships the same bytes. The executor turns the descriptor into a
//! [`PreparedRequest`] per attempt by attaching headers, most importantly the authorization
//! value current at that instant.

// crates.io
use url::form_urlencoded::Serializer;
// self
use crate::_prelude::*;

/// `Accept` value the API expects from clients.
pub const ACCEPT_API_V2: &str = "application/vnd.itch.v2";
/// `Content-Type` of form-encoded bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP methods used by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// Idempotent read.
	Get,
	/// Form submission.
	Post,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// URL-encoded form body, captured once and shared by every attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct FormBody(Arc<str>);
impl FormBody {
	/// Encodes key/value pairs in the given order.
	pub fn encode<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let mut serializer = Serializer::new(String::new());

		for (key, value) in pairs {
			serializer.append_pair(key.as_ref(), value.as_ref());
		}

		Self(serializer.finish().into())
	}

	/// Returns the encoded body.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns the encoded body as bytes.
	pub fn as_bytes(&self) -> &[u8] {
		self.0.as_bytes()
	}
}
impl Debug for FormBody {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		// Bodies carry refresh tokens and passwords.
		write!(f, "FormBody(<{} bytes>)", self.0.len())
	}
}

/// Description of one logical API call, re-encodable identically across attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including the query string.
	pub url: Url,
	/// Form body for non-idempotent methods.
	pub body: Option<FormBody>,
}
impl ApiRequest {
	/// Describes a `GET` of `url`.
	pub fn get(url: Url) -> Self {
		Self { method: Method::Get, url, body: None }
	}

	/// Describes a form `POST` to `url`; the body is encoded immediately.
	pub fn post_form<I, K, V>(url: Url, form: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		Self { method: Method::Post, url, body: Some(FormBody::encode(form)) }
	}

	/// Returns the URL path, used to label errors.
	pub fn path(&self) -> &str {
		self.url.path()
	}
}

/// A single physical attempt, ready for a transport to dispatch.
#[derive(Clone)]
pub struct PreparedRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including the query string.
	pub url: Url,
	/// Header name/value pairs, in insertion order.
	pub headers: Vec<(&'static str, String)>,
	/// Shared form body, byte-identical across attempts.
	pub body: Option<FormBody>,
	/// One-based attempt number within the logical call.
	pub attempt: usize,
}
impl PreparedRequest {
	/// Returns the first value of `name` (case-insensitive).
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers
			.iter()
			.find(|(key, _)| key.eq_ignore_ascii_case(name))
			.map(|(_, value)| value.as_str())
	}
}
impl Debug for PreparedRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| {
				if name.eq_ignore_ascii_case("authorization") {
					(*name, "<redacted>")
				} else {
					(*name, value.as_str())
				}
			})
			.collect::<Vec<_>>();

		f.debug_struct("PreparedRequest")
			.field("method", &self.method)
			.field("url", &self.url.as_str())
			.field("headers", &headers)
			.field("body", &self.body)
			.field("attempt", &self.attempt)
			.finish()
	}
}

/// Fully-buffered response returned by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// URL the response was served for.
	pub url: Url,
	/// Response body; `None` for bodyless responses.
	pub body: Option<Vec<u8>>,
}
impl RawResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status / 100 == 2
	}

	/// Returns the URL path, used to label errors.
	pub fn path(&self) -> &str {
		self.url.path()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn form_body_keeps_pair_order_and_encoding() {
		let body = FormBody::encode([("target", "user/game"), ("channel", "stable beta")]);

		assert_eq!(body.as_str(), "target=user%2Fgame&channel=stable+beta");
	}

	#[test]
	fn success_spans_the_2xx_range() {
		let url = Url::parse("https://api.itch.io/profile").expect("Fixture URL should parse.");
		let status = |status| RawResponse { status, url: url.clone(), body: None }.is_success();

		assert!(status(200));
		assert!(status(204));
		assert!(status(299));
		assert!(!status(199));
		assert!(!status(301));
		assert!(!status(503));
	}

	#[test]
	fn prepared_request_redacts_authorization() {
		let request = PreparedRequest {
			method: Method::Get,
			url: Url::parse("https://api.itch.io/profile").expect("Fixture URL should parse."),
			headers: vec![("Authorization", "Bearer secret".into()), ("Accept", ACCEPT_API_V2.into())],
			body: None,
			attempt: 1,
		};
		let rendered = format!("{request:?}");

		assert!(!rendered.contains("secret"));
		assert_eq!(request.header("authorization"), Some("Bearer secret"));
	}
}
