//! Credential models: API keys, OAuth token pairs, and the secret wrapper both use.

pub mod token;

pub use token::{credentials::*, secret::*};

// self
use crate::{_prelude::*, oauth::TokenManager};

/// How a client authenticates its calls.
#[derive(Clone, Debug)]
pub enum Credential {
	/// Raw API key sent verbatim as the `Authorization` value.
	ApiKey(TokenSecret),
	/// OAuth bearer credentials with automatic refresh.
	OAuth(Arc<TokenManager>),
}
impl Credential {
	/// Returns the `Authorization` value current at this instant.
	pub fn authorization(&self) -> String {
		match self {
			Credential::ApiKey(key) => key.expose().to_owned(),
			Credential::OAuth(manager) => manager.current_bearer(),
		}
	}

	/// Returns the token manager for OAuth credentials.
	pub fn oauth(&self) -> Option<&Arc<TokenManager>> {
		match self {
			Credential::OAuth(manager) => Some(manager),
			Credential::ApiKey(_) => None,
		}
	}
}
