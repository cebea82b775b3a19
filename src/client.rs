//! The API client: header assembly, the refresh rules layered over the attempt loop, and typed
//! call helpers.
//!
//! [`Client::send`] is the single entry point every call passes through. For OAuth clients it
//! refreshes a credential about to expire before the first attempt, then runs the attempt loop
//! from [`retry`]. A 401 answer triggers exactly one refresh and exactly one resend; a second 401
//! is handed back to the caller. Refresh grants themselves go through the same loop with
//! [`RefreshPolicy::Skip`], so they are rate limited and retried but never refresh recursively.

pub mod builder;
pub mod retry;

pub use builder::*;
pub use retry::RetryPolicy;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{Credential, OAuthCredentials},
	context::CallContext,
	decode,
	ext::{Observers, RateLimiter},
	http::ApiTransport,
	oauth::{RefreshExchange, RefreshFuture, RefreshGrant, TokenManager},
	obs::{self, CallKind, CallOutcome, CallSpan},
	request::{ACCEPT_API_V2, ApiRequest, FORM_CONTENT_TYPE, PreparedRequest, RawResponse},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Client backed by the default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestApiClient = Client<ReqwestTransport>;

/// Whether a call may refresh OAuth credentials.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
	/// Refresh proactively before sending and reactively after a 401.
	#[default]
	Allow,
	/// Never refresh; used by the refresh grant itself.
	Skip,
}

/// Long-lived API client.
///
/// Cloning is cheap and clones share the transport, limiter, observers, and credential state.
pub struct Client<T>
where
	T: ?Sized + ApiTransport,
{
	pub(crate) transport: Arc<T>,
	pub(crate) credential: Credential,
	pub(crate) base_url: String,
	pub(crate) user_agent: String,
	pub(crate) accept_language: String,
	pub(crate) limiter: Arc<RateLimiter>,
	pub(crate) retry: RetryPolicy,
	pub(crate) observers: Observers,
}
impl<T> Client<T>
where
	T: ApiTransport,
{
	/// Starts a builder around `transport`.
	pub fn builder(transport: T) -> ClientBuilder<T> {
		ClientBuilder::new(Arc::new(transport))
	}
}
#[cfg(feature = "reqwest")]
impl Client<ReqwestTransport> {
	/// Starts a builder for an API-key client on a default reqwest transport.
	pub fn builder_with_key(key: impl Into<String>) -> Result<ClientBuilder<ReqwestTransport>> {
		Ok(Self::builder(ReqwestTransport::new()?).api_key(key))
	}

	/// Starts a builder for an OAuth client on a default reqwest transport.
	pub fn builder_with_oauth(
		credentials: OAuthCredentials,
		config: crate::oauth::OAuthConfig,
	) -> Result<ClientBuilder<ReqwestTransport>> {
		Ok(Self::builder(ReqwestTransport::new()?).oauth(credentials, config))
	}
}
impl<T> Client<T>
where
	T: ?Sized + ApiTransport,
{
	/// Returns the API base URL without a trailing slash.
	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	/// Returns the limiter consulted before every attempt.
	pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
		&self.limiter
	}

	/// Returns the backoff schedule.
	pub fn retry_policy(&self) -> &RetryPolicy {
		&self.retry
	}

	/// Returns `true` for clients authenticated with OAuth credentials.
	pub fn is_oauth(&self) -> bool {
		self.credential.oauth().is_some()
	}

	/// Returns a copy of the current OAuth credentials.
	pub fn oauth_credentials(&self) -> Option<OAuthCredentials> {
		self.credential.oauth().map(|manager| manager.credentials())
	}

	/// Returns the token manager of an OAuth client.
	pub fn token_manager(&self) -> Option<&Arc<TokenManager>> {
		self.credential.oauth()
	}

	/// Joins `path` onto the base URL, trimming surrounding slashes.
	pub fn make_path(&self, path: &str) -> Result<Url> {
		self.make_values_path(path, std::iter::empty::<(&str, &str)>())
	}

	/// Joins `path` onto the base URL and appends the encoded query pairs, if any.
	pub fn make_values_path<I, K, V>(&self, path: &str, query: I) -> Result<Url>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let raw = format!("{}/{}", self.base_url, path.trim_matches('/'));
		let mut url = Url::parse(&raw)
			.map_err(|source| crate::error::ConfigError::InvalidUrl { url: raw.clone(), source })?;
		let mut query = query.into_iter().peekable();

		if query.peek().is_some() {
			url.query_pairs_mut().extend_pairs(query);
		}

		Ok(url)
	}

	/// Executes one logical call and returns the final raw response.
	///
	/// Non-2xx responses are returned as-is; classify them with
	/// [`decode::parse_api_response`]. Errors are returned for cancellation, fatal transport
	/// failures, retries exhausted on a transient transport failure, and failed refreshes.
	pub async fn send(
		&self,
		ctx: &CallContext,
		request: &ApiRequest,
		refresh: RefreshPolicy,
	) -> Result<RawResponse> {
		let kind = match refresh {
			RefreshPolicy::Allow => CallKind::Api,
			RefreshPolicy::Skip => CallKind::Refresh,
		};
		let span = CallSpan::new(kind, "send");

		obs::record_call_outcome(kind, CallOutcome::Attempt);

		let result = span.instrument(self.send_with_refresh(ctx, request, refresh, kind)).await;
		let outcome = match &result {
			Ok(response) if response.status < 400 => CallOutcome::Success,
			_ => CallOutcome::Failure,
		};

		obs::record_call_outcome(kind, outcome);

		result
	}

	/// Sends a `GET` and decodes the response into `R`.
	pub async fn get_response<R>(&self, ctx: &CallContext, url: Url) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let response = self.send(ctx, &ApiRequest::get(url), RefreshPolicy::Allow).await?;

		decode::parse_api_response(Some(response))
	}

	/// Sends a form `POST` and decodes the response into `R`.
	pub async fn post_form_response<R, I, K, V>(
		&self,
		ctx: &CallContext,
		url: Url,
		form: I,
	) -> Result<R>
	where
		R: DeserializeOwned,
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let request = ApiRequest::post_form(url, form);
		let response = self.send(ctx, &request, RefreshPolicy::Allow).await?;

		decode::parse_api_response(Some(response))
	}

	async fn send_with_refresh(
		&self,
		ctx: &CallContext,
		request: &ApiRequest,
		refresh: RefreshPolicy,
		kind: CallKind,
	) -> Result<RawResponse> {
		let manager = match refresh {
			RefreshPolicy::Allow => self.credential.oauth(),
			RefreshPolicy::Skip => None,
		};

		if let Some(manager) = manager {
			manager.ensure_fresh(ctx, self).await?;
		}

		let attempted = self.execute(ctx, request, kind).await?;

		let Some(manager) = manager.filter(|_| attempted.response.status == 401) else {
			return Ok(attempted.response);
		};
		let rejected = attempted.request.header("Authorization").unwrap_or_default();

		manager.refresh_rejected(ctx, rejected, self).await?;

		obs::resend_after_refresh(&attempted.request);
		obs::record_call_outcome(kind, CallOutcome::Retry);

		// A second 401 is final.
		Ok(self.execute(ctx, request, kind).await?.response)
	}

	pub(crate) fn prepare(&self, request: &ApiRequest, attempt: usize) -> PreparedRequest {
		let mut headers = vec![
			("Authorization", self.credential.authorization()),
			("User-Agent", self.user_agent.clone()),
			("Accept-Language", self.accept_language.clone()),
			("Accept", ACCEPT_API_V2.to_owned()),
		];

		if request.body.is_some() {
			headers.push(("Content-Type", FORM_CONTENT_TYPE.to_owned()));
		}

		PreparedRequest {
			method: request.method,
			url: request.url.clone(),
			headers,
			body: request.body.clone(),
			attempt,
		}
	}
}
impl<T> Clone for Client<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			credential: self.credential.clone(),
			base_url: self.base_url.clone(),
			user_agent: self.user_agent.clone(),
			accept_language: self.accept_language.clone(),
			limiter: self.limiter.clone(),
			retry: self.retry.clone(),
			observers: self.observers.clone(),
		}
	}
}
impl<T> Debug for Client<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Client")
			.field("base_url", &self.base_url)
			.field("credential", &self.credential)
			.field("user_agent", &self.user_agent)
			.field("accept_language", &self.accept_language)
			.field("limiter", &self.limiter)
			.field("retry", &self.retry)
			.field("observers", &self.observers)
			.finish()
	}
}
impl<T> RefreshExchange for Client<T>
where
	T: ?Sized + ApiTransport,
{
	fn exchange<'a>(&'a self, ctx: &'a CallContext, grant: RefreshGrant) -> RefreshFuture<'a> {
		Box::pin(async move {
			let url = self.make_path(RefreshGrant::PATH)?;
			let request = ApiRequest::post_form(url, grant.form());
			let response = self.send(ctx, &request, RefreshPolicy::Skip).await?;

			decode::parse_api_response(Some(response))
		})
	}
}
