//! Validated construction of [`Client`] values.

// self
use crate::{
	_prelude::*,
	auth::{Credential, OAuthCredentials, TokenSecret},
	client::{Client, RetryPolicy},
	error::ConfigError,
	ext::{Observers, RateLimitObserver, RateLimiter, RequestObserver},
	http::ApiTransport,
	oauth::{OAuthConfig, TokenManager},
};

/// API root used by OAuth clients.
pub const DEFAULT_OAUTH_SERVER: &str = "https://api.itch.io";
/// API root used by API-key clients.
pub const DEFAULT_KEY_SERVER: &str = "https://itch.io";
/// Path appended to a server root to form the API base URL.
pub const API_PATH: &str = "/api/1";
/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = concat!("itchio-api/", env!("CARGO_PKG_VERSION"));
/// Default `Accept-Language` header.
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "*";

enum PendingCredential {
	ApiKey(TokenSecret),
	OAuth(OAuthCredentials, OAuthConfig),
}

/// Builder for [`Client`] values; settings are validated by [`ClientBuilder::build`].
pub struct ClientBuilder<T>
where
	T: ?Sized + ApiTransport,
{
	transport: Arc<T>,
	credential: Option<PendingCredential>,
	base_url: Option<String>,
	user_agent: String,
	accept_language: String,
	limiter: Option<Arc<RateLimiter>>,
	retry: RetryPolicy,
	observers: Observers,
}
impl<T> ClientBuilder<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a builder around a transport that may be shared with other clients.
	pub fn new(transport: Arc<T>) -> Self {
		Self {
			transport,
			credential: None,
			base_url: None,
			user_agent: DEFAULT_USER_AGENT.into(),
			accept_language: DEFAULT_ACCEPT_LANGUAGE.into(),
			limiter: None,
			retry: RetryPolicy::default(),
			observers: Observers::default(),
		}
	}

	/// Authenticates with a raw API key.
	pub fn api_key(mut self, key: impl Into<String>) -> Self {
		self.credential = Some(PendingCredential::ApiKey(TokenSecret::new(key)));

		self
	}

	/// Authenticates with OAuth credentials that refresh automatically.
	pub fn oauth(mut self, credentials: OAuthCredentials, config: OAuthConfig) -> Self {
		self.credential = Some(PendingCredential::OAuth(credentials, config));

		self
	}

	/// Points the client at `server`; the base URL becomes `<server>/api/1`.
	pub fn server(mut self, server: &str) -> Self {
		self.base_url = Some(format!("{}{API_PATH}", server.trim_end_matches('/')));

		self
	}

	/// Uses `base_url` verbatim as the API base URL.
	pub fn base_url(mut self, base_url: &str) -> Self {
		self.base_url = Some(base_url.to_owned());

		self
	}

	/// Overrides the `User-Agent` header.
	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Overrides the `Accept-Language` header.
	pub fn accepted_language(mut self, language: impl Into<String>) -> Self {
		self.accept_language = language.into();

		self
	}

	/// Uses `limiter`; pass the same `Arc` to several clients to share one budget.
	///
	/// Without this call every client gets its own default limiter, so two clients in one process
	/// may together send twice the default rate. To bound them jointly, build one
	/// `Arc<RateLimiter>` where the clients are wired up and pass it to each builder.
	pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
		self.limiter = Some(limiter);

		self
	}

	/// Overrides the backoff schedule.
	pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Registers a hook invoked before every physical attempt.
	pub fn on_outgoing_request(mut self, observer: impl 'static + RequestObserver) -> Self {
		self.observers.outgoing_request = Some(Arc::new(observer));

		self
	}

	/// Registers a hook invoked for every 503 response.
	pub fn on_rate_limited(mut self, observer: impl 'static + RateLimitObserver) -> Self {
		self.observers.rate_limited = Some(Arc::new(observer));

		self
	}

	/// Validates the settings and builds the client.
	pub fn build(self) -> Result<Client<T>, ConfigError> {
		let credential = self.credential.ok_or(ConfigError::MissingCredential)?;
		let default_server = match credential {
			PendingCredential::ApiKey(_) => DEFAULT_KEY_SERVER,
			PendingCredential::OAuth(..) => DEFAULT_OAUTH_SERVER,
		};
		let base_url = self.base_url.unwrap_or_else(|| format!("{default_server}{API_PATH}"));

		Url::parse(&base_url)
			.map_err(|source| ConfigError::InvalidUrl { url: base_url.clone(), source })?;

		let credential = match credential {
			PendingCredential::ApiKey(key) => Credential::ApiKey(key),
			PendingCredential::OAuth(credentials, config) =>
				Credential::OAuth(Arc::new(TokenManager::new(credentials, config)?)),
		};

		Ok(Client {
			transport: self.transport,
			credential,
			base_url: base_url.trim_end_matches('/').to_owned(),
			user_agent: self.user_agent,
			accept_language: self.accept_language,
			limiter: self.limiter.unwrap_or_default(),
			retry: self.retry,
			observers: self.observers,
		})
	}
}
impl<T> Debug for ClientBuilder<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientBuilder")
			.field("credential_set", &self.credential.is_some())
			.field("base_url", &self.base_url)
			.field("user_agent", &self.user_agent)
			.field("accept_language", &self.accept_language)
			.field("retry", &self.retry)
			.field("observers", &self.observers)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		error::TransportError,
		http::TransportFuture,
		request::PreparedRequest,
	};

	struct NoopTransport;
	impl ApiTransport for NoopTransport {
		fn send(&self, _request: PreparedRequest) -> TransportFuture<'_> {
			Box::pin(async {
				Err(TransportError::Io(std::io::Error::other("noop transport never sends")))
			})
		}
	}

	fn builder() -> ClientBuilder<NoopTransport> {
		Client::builder(NoopTransport)
	}

	#[test]
	fn credential_is_required() {
		let err = builder().build().expect_err("Builders without credentials should fail.");

		assert!(matches!(err, ConfigError::MissingCredential));
	}

	#[test]
	fn oauth_clients_default_to_the_api_server() {
		let client = builder()
			.oauth(OAuthCredentials::new("access", "refresh"), OAuthConfig::new("client"))
			.build()
			.expect("OAuth client should build.");

		assert_eq!(client.base_url(), "https://api.itch.io/api/1");
		assert!(client.is_oauth());
	}

	#[test]
	fn server_overrides_append_the_api_path() {
		let client = builder()
			.api_key("key")
			.server("http://localhost:8080/")
			.build()
			.expect("Key client should build.");

		assert_eq!(client.base_url(), "http://localhost:8080/api/1");
	}

	#[test]
	fn invalid_urls_and_client_ids_are_rejected() {
		let err = builder().api_key("key").base_url("not a url").build();

		assert!(matches!(err, Err(ConfigError::InvalidUrl { .. })));

		let err = builder()
			.oauth(OAuthCredentials::new("access", "refresh"), OAuthConfig::new(""))
			.build();

		assert!(matches!(err, Err(ConfigError::MissingClientId)));
	}

	#[test]
	fn default_limiters_are_private_unless_shared() {
		let build = |limiter: Option<Arc<RateLimiter>>| {
			let builder = builder().api_key("key");
			let builder = match limiter {
				Some(limiter) => builder.rate_limiter(limiter),
				None => builder,
			};

			builder.build().expect("Key client should build.")
		};
		let first = build(None);
		let second = build(None);

		assert!(!Arc::ptr_eq(first.rate_limiter(), second.rate_limiter()));
		assert_eq!(first.rate_limiter().rate(), Some(RateLimiter::DEFAULT_RATE));

		let shared = Arc::new(RateLimiter::default());
		let first = build(Some(shared.clone()));
		let second = build(Some(shared));

		assert!(Arc::ptr_eq(first.rate_limiter(), second.rate_limiter()));
		assert_eq!(first.rate_limiter().burst(), Some(RateLimiter::DEFAULT_BURST));
	}

	#[test]
	fn query_values_are_encoded() {
		let client = builder().api_key("key").build().expect("Key client should build.");
		let url = client
			.make_values_path("/search/games/", [("query", "space & time"), ("page", "2")])
			.expect("Search path should join.");

		assert_eq!(url.as_str(), "https://itch.io/api/1/search/games?query=space+%26+time&page=2");
	}
}
