//! OAuth credential snapshots and their expiry arithmetic.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Access/refresh token pair with an optional absolute expiry.
///
/// Values of this type are always copies: the token manager hands out clones of its snapshot
/// and never a reference into its own state.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthCredentials {
	/// Bearer token attached to API calls; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Token exchanged for a new access token.
	pub refresh_token: TokenSecret,
	/// Expiry instant; `None` marks a credential that never expires.
	#[serde(with = "time::serde::rfc3339::option")]
	pub expires_at: Option<OffsetDateTime>,
}
impl OAuthCredentials {
	/// Creates non-expiring credentials.
	pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access_token),
			refresh_token: TokenSecret::new(refresh_token),
			expires_at: None,
		}
	}

	/// Sets an absolute expiry instant.
	pub fn with_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the expiry from a server-reported lifetime in seconds, measured from `issued_at`.
	///
	/// Non-positive lifetimes mean the credential never expires.
	pub fn with_expires_in(mut self, expires_in: i64, issued_at: OffsetDateTime) -> Self {
		self.expires_at = expiry_from_lifetime(expires_in, issued_at);

		self
	}

	/// Returns `true` once the expiry instant has passed at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant > expires_at)
	}

	/// Returns `true` if the credential has expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the credential expires within `window` of `instant`.
	pub fn expires_within_at(&self, window: Duration, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant + window >= expires_at)
	}

	/// Returns `true` if the credential expires within `window` of the current clock.
	pub fn expires_within(&self, window: Duration) -> bool {
		self.expires_within_at(window, OffsetDateTime::now_utc())
	}

	/// Returns the `Authorization` header value for these credentials.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}
impl Debug for OAuthCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthCredentials")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Converts a lifetime in seconds into an absolute expiry; non-positive means "never".
pub fn expiry_from_lifetime(expires_in: i64, issued_at: OffsetDateTime) -> Option<OffsetDateTime> {
	if expires_in <= 0 {
		return None;
	}

	issued_at.checked_add(Duration::seconds(expires_in))
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn non_positive_lifetimes_never_expire() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);

		for lifetime in [0, -1, -3_600] {
			let creds = OAuthCredentials::new("access", "refresh").with_expires_in(lifetime, issued);

			assert_eq!(creds.expires_at, None);
			assert!(!creds.is_expired_at(macros::datetime!(2100-01-01 00:00 UTC)));
			assert!(
				!creds.expires_within_at(Duration::days(36_500), macros::datetime!(2100-01-01 00:00 UTC))
			);
		}
	}

	#[test]
	fn expiry_window_is_inclusive() {
		let creds = OAuthCredentials::new("access", "refresh")
			.with_expires_at(macros::datetime!(2025-01-01 01:00 UTC));

		assert!(!creds.expires_within_at(Duration::seconds(60), macros::datetime!(2025-01-01 00:58 UTC)));
		assert!(creds.expires_within_at(Duration::seconds(60), macros::datetime!(2025-01-01 00:59 UTC)));
		assert!(!creds.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));
		assert!(creds.is_expired_at(macros::datetime!(2025-01-01 01:00:01 UTC)));
	}

	#[test]
	fn relative_expiry_is_measured_from_issue_time() {
		let creds = OAuthCredentials::new("access", "refresh")
			.with_expires_in(120, macros::datetime!(2025-01-01 00:00 UTC));

		assert_eq!(creds.expires_at, Some(macros::datetime!(2025-01-01 00:02 UTC)));
		assert_eq!(creds.bearer(), "Bearer access");
	}

	#[test]
	fn debug_output_redacts_tokens() {
		let rendered = format!("{:?}", OAuthCredentials::new("access-secret", "refresh-secret"));

		assert!(!rendered.contains("secret"));
	}
}
