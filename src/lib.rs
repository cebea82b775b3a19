//! itch.io API client core: rate-limited, retrying request execution with OAuth credentials that
//! refresh exactly once under contention, plus a forgiving response decoder for the API's
//! snake_case/camelCase JSON envelopes.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod context;
pub mod decode;
pub mod error;
pub mod ext;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod request;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for unit and integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::OAuthCredentials,
		client::{ClientBuilder, ReqwestApiClient, RetryPolicy},
		ext::RateLimiter,
		http::ReqwestTransport,
		oauth::OAuthConfig,
	};

	/// OAuth client identifier used across integration tests.
	pub const TEST_CLIENT_ID: &str = "client-123";

	/// Retry policy with millisecond backoffs and no jitter so tests stay fast and deterministic.
	pub fn fast_retry_policy(attempts: usize) -> RetryPolicy {
		RetryPolicy::new(vec![StdDuration::from_millis(1); attempts.saturating_sub(1)])
			.with_max_jitter(StdDuration::ZERO)
	}

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Starts an OAuth client builder pointed at `base_url` with an unlimited rate limiter and
	/// the fast retry policy.
	pub fn test_oauth_client_builder(
		base_url: &str,
		credentials: OAuthCredentials,
	) -> ClientBuilder<ReqwestTransport> {
		ReqwestApiClient::builder(test_reqwest_transport())
			.oauth(credentials, OAuthConfig::new(TEST_CLIENT_ID))
			.base_url(base_url)
			.rate_limiter(Arc::new(RateLimiter::unlimited()))
			.retry_policy(fast_retry_policy(3))
	}

	/// Builds an OAuth client pointed at `base_url`.
	pub fn build_test_oauth_client(
		base_url: &str,
		credentials: OAuthCredentials,
	) -> ReqwestApiClient {
		test_oauth_client_builder(base_url, credentials)
			.build()
			.expect("Test OAuth client should build successfully.")
	}

	/// Builds an API-key client pointed at `base_url`.
	pub fn build_test_key_client(base_url: &str, key: &str) -> ReqwestApiClient {
		ReqwestApiClient::builder(test_reqwest_transport())
			.api_key(key)
			.base_url(base_url)
			.rate_limiter(Arc::new(RateLimiter::unlimited()))
			.retry_policy(fast_retry_policy(3))
			.build()
			.expect("Test key client should build successfully.")
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use serde;
pub use url;
#[cfg(test)] use httpmock as _;
