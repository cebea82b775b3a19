//! OAuth credential lifecycle: proactive and reactive refresh without stampedes.
//!
//! A [`TokenManager`] owns the credential snapshot behind a read/write lock and serializes
//! refreshes behind a separate async mutex. Readers (every outgoing request asking for the
//! current bearer) only ever take the read lock, so they wait at most for the pointer-sized swap
//! at the end of a refresh, never for the refresh round-trip itself.
//!
//! Proactive refresh ([`TokenManager::ensure_fresh`]) double-checks: a cheap check under the
//! read lock, then the refresh lock, then the same check again, because whoever held the
//! refresh lock before us has most likely just refreshed. Reactive refresh after a 401
//! ([`TokenManager::force_refresh`]) skips the checks.
//!
//! The refresh grant itself is sent by a [`RefreshExchange`], normally the owning client, which
//! must dispatch it without consulting this manager again.

mod metrics;

pub use self::metrics::RefreshMetrics;

// crates.io
use async_lock::MutexGuard as AsyncMutexGuard;
// self
use crate::{
	_prelude::*,
	auth::{OAuthCredentials, TokenSecret, expiry_from_lifetime},
	context::CallContext,
	error::ConfigError,
	ext::RefreshObserver,
	obs::{self, CallKind, CallSpan},
};

/// Boxed future returned by [`RefreshExchange::exchange`].
pub type RefreshFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RefreshGrantResponse>> + 'a + Send>>;

/// Sends refresh grants on behalf of a [`TokenManager`].
///
/// Implementations must send the grant without triggering another refresh (the manager holds
/// its refresh lock for the whole exchange, so re-entering it would deadlock).
pub trait RefreshExchange
where
	Self: Send + Sync,
{
	/// Exchanges the refresh token in `grant` for new credentials.
	fn exchange<'a>(&'a self, ctx: &'a CallContext, grant: RefreshGrant) -> RefreshFuture<'a>;
}

/// Form parameters of a `grant_type=refresh_token` call.
#[derive(Clone, Debug)]
pub struct RefreshGrant {
	/// Refresh token being exchanged.
	pub refresh_token: TokenSecret,
	/// OAuth client identifier.
	pub client_id: String,
}
impl RefreshGrant {
	/// Endpoint path, relative to the API base URL.
	pub const PATH: &'static str = "oauth/token";

	/// Returns the form body in wire order.
	pub fn form(&self) -> [(&'static str, &str); 3] {
		[
			("grant_type", "refresh_token"),
			("refresh_token", self.refresh_token.expose()),
			("client_id", self.client_id.as_str()),
		]
	}
}

/// Successful refresh response.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshGrantResponse {
	/// New access token.
	pub access_token: String,
	/// Rotated refresh token; absent or empty keeps the previous one.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// Lifetime in seconds; absent or non-positive means the token never expires.
	#[serde(default)]
	pub expires_in: Option<i64>,
}
impl Debug for RefreshGrantResponse {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshGrantResponse")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_in", &self.expires_in)
			.finish()
	}
}

/// Refresh behavior of an OAuth client.
#[derive(Clone)]
pub struct OAuthConfig {
	/// Client identifier sent with refresh grants.
	pub client_id: String,
	/// How long before expiry a proactive refresh kicks in.
	pub refresh_buffer: Duration,
	/// Invoked with a copy of the credentials after every successful refresh.
	pub on_refresh: Option<Arc<dyn RefreshObserver>>,
}
impl OAuthConfig {
	/// Default proactive refresh window.
	pub const DEFAULT_REFRESH_BUFFER: Duration = Duration::seconds(60);

	/// Creates a config with the default refresh window and no observer.
	pub fn new(client_id: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			refresh_buffer: Self::DEFAULT_REFRESH_BUFFER,
			on_refresh: None,
		}
	}

	/// Overrides the proactive refresh window; negative windows clamp to zero.
	pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
		self.refresh_buffer = if buffer.is_negative() { Duration::ZERO } else { buffer };

		self
	}

	/// Registers the post-refresh observer (typically persistence).
	pub fn on_refresh(mut self, observer: impl 'static + RefreshObserver) -> Self {
		self.on_refresh = Some(Arc::new(observer));

		self
	}
}
impl Debug for OAuthConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthConfig")
			.field("client_id", &self.client_id)
			.field("refresh_buffer", &self.refresh_buffer)
			.field("on_refresh_set", &self.on_refresh.is_some())
			.finish()
	}
}

/// Owner of one client's OAuth credentials.
pub struct TokenManager {
	credentials: RwLock<OAuthCredentials>,
	refresh_lock: AsyncMutex<()>,
	client_id: String,
	refresh_buffer: Duration,
	on_refresh: Option<Arc<dyn RefreshObserver>>,
	metrics: RefreshMetrics,
}
impl TokenManager {
	/// Creates a manager seeded with `credentials`.
	pub fn new(credentials: OAuthCredentials, config: OAuthConfig) -> Result<Self, ConfigError> {
		if config.client_id.trim().is_empty() {
			return Err(ConfigError::MissingClientId);
		}

		Ok(Self {
			credentials: RwLock::new(credentials),
			refresh_lock: AsyncMutex::new(()),
			client_id: config.client_id,
			refresh_buffer: config.refresh_buffer,
			on_refresh: config.on_refresh,
			metrics: RefreshMetrics::default(),
		})
	}

	/// Returns a copy of the current credentials.
	pub fn credentials(&self) -> OAuthCredentials {
		self.credentials.read().clone()
	}

	/// Returns `Bearer <access token>` for the current credentials; never waits on a refresh.
	pub fn current_bearer(&self) -> String {
		self.credentials.read().bearer()
	}

	/// Returns the proactive refresh window.
	pub fn refresh_buffer(&self) -> Duration {
		self.refresh_buffer
	}

	/// Returns refresh counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Returns `true` if the credential expires within the refresh window of `instant`.
	///
	/// Non-expiring credentials never need a proactive refresh.
	pub fn needs_refresh_at(&self, instant: OffsetDateTime) -> bool {
		self.credentials.read().expires_within_at(self.refresh_buffer, instant)
	}

	/// Returns `true` if the credential expires within the refresh window from now.
	pub fn needs_refresh(&self) -> bool {
		self.needs_refresh_at(OffsetDateTime::now_utc())
	}

	/// Refreshes the credential if it is about to expire.
	///
	/// Concurrent callers that all observe a stale credential trigger exactly one refresh; the
	/// rest wait on the refresh lock and then find the credential fresh.
	pub async fn ensure_fresh(&self, ctx: &CallContext, exchange: &dyn RefreshExchange) -> Result<()> {
		if !self.needs_refresh() {
			return Ok(());
		}

		let guard = ctx.run(self.refresh_lock.lock()).await?;

		if !self.needs_refresh() {
			self.metrics.record_skipped();

			return Ok(());
		}

		self.refresh_locked(&guard, ctx, exchange).await
	}

	/// Refreshes the credential unconditionally, e.g. after the server rejected it with 401.
	pub async fn force_refresh(&self, ctx: &CallContext, exchange: &dyn RefreshExchange) -> Result<()> {
		let guard = ctx.run(self.refresh_lock.lock()).await?;

		self.refresh_locked(&guard, ctx, exchange).await
	}

	/// Refreshes after the server rejected `rejected_bearer`, unless another caller already
	/// replaced that credential while this one waited on the refresh lock.
	pub async fn refresh_rejected(
		&self,
		ctx: &CallContext,
		rejected_bearer: &str,
		exchange: &dyn RefreshExchange,
	) -> Result<()> {
		let guard = ctx.run(self.refresh_lock.lock()).await?;

		if self.current_bearer() != rejected_bearer {
			self.metrics.record_skipped();

			return Ok(());
		}

		self.refresh_locked(&guard, ctx, exchange).await
	}

	async fn refresh_locked(
		&self,
		_guard: &AsyncMutexGuard<'_, ()>,
		ctx: &CallContext,
		exchange: &dyn RefreshExchange,
	) -> Result<()> {
		// Call outcomes are counted by the exchange's own send.
		let span = CallSpan::new(CallKind::Refresh, "refresh");

		self.metrics.record_attempt();

		let previous_refresh = self.credentials.read().refresh_token.clone();
		let grant =
			RefreshGrant { refresh_token: previous_refresh.clone(), client_id: self.client_id.clone() };
		let response = match span.instrument(exchange.exchange(ctx, grant)).await {
			Ok(response) => response,
			Err(err) => {
				self.metrics.record_failure();

				return Err(Error::refresh(err));
			},
		};
		let refreshed = OAuthCredentials {
			access_token: TokenSecret::new(response.access_token),
			refresh_token: response
				.refresh_token
				.filter(|token| !token.is_empty())
				.map(TokenSecret::new)
				.unwrap_or(previous_refresh),
			expires_at: expiry_from_lifetime(
				response.expires_in.unwrap_or_default(),
				OffsetDateTime::now_utc(),
			),
		};

		*self.credentials.write() = refreshed.clone();

		self.metrics.record_success();

		if let Some(observer) = &self.on_refresh
			&& let Err(err) = observer.on_refresh(refreshed)
		{
			obs::refresh_observer_failed(err.as_ref());
		}

		Ok(())
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("credentials", &*self.credentials.read())
			.field("client_id", &self.client_id)
			.field("refresh_buffer", &self.refresh_buffer)
			.field("on_refresh_set", &self.on_refresh.is_some())
			.finish()
	}
}
