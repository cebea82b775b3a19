//! Serde helpers for RFC 3339 timestamps with optional fractional seconds.
//!
//! Use with `#[serde(with = "itchio_api::decode::timestamp")]`, or the [`option`] variant for
//! fields the API may omit, null, or send as an empty string.

// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError, ser::Error as SerError};
use time::format_description::well_known::Rfc3339;
// self
use crate::_prelude::*;

/// Serializes `instant` as RFC 3339.
pub fn serialize<S>(instant: &OffsetDateTime, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let rendered = instant.format(&Rfc3339).map_err(SerError::custom)?;

	serializer.serialize_str(&rendered)
}

/// Deserializes an RFC 3339 timestamp.
pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	parse(&raw).map_err(DeError::custom)
}

/// Parses an RFC 3339 timestamp such as `2017-05-23T15:44:02.000000Z`.
pub fn parse(raw: &str) -> std::result::Result<OffsetDateTime, time::error::Parse> {
	OffsetDateTime::parse(raw, &Rfc3339)
}

/// Optional timestamps; missing, null, and empty values decode as `None`.
pub mod option {
	// self
	use super::*;

	/// Serializes `Some` as RFC 3339 and `None` as null.
	pub fn serialize<S>(
		instant: &Option<OffsetDateTime>,
		serializer: S,
	) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match instant {
			Some(instant) => super::serialize(instant, serializer),
			None => serializer.serialize_none(),
		}
	}

	/// Deserializes an optional RFC 3339 timestamp.
	pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Option<OffsetDateTime>, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Option::<String>::deserialize(deserializer)? {
			Some(raw) if !raw.is_empty() => parse(&raw).map(Some).map_err(DeError::custom),
			_ => Ok(None),
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	use time::macros;
	// self
	use super::*;
	use crate::decode::decode_document;

	#[derive(Debug, Deserialize, Serialize)]
	#[serde(rename_all = "camelCase")]
	struct Build {
		#[serde(with = "crate::decode::timestamp")]
		created_at: OffsetDateTime,
		#[serde(default, with = "crate::decode::timestamp::option")]
		published_at: Option<OffsetDateTime>,
	}

	#[test]
	fn fractional_seconds_parse() {
		let build: Build = decode_document(&json!({
			"createdAt": "2017-05-23T15:44:02.123456Z",
			"publishedAt": "",
		}))
		.expect("Timestamps should decode.");

		assert_eq!(build.created_at, macros::datetime!(2017-05-23 15:44:02.123456 UTC));
		assert_eq!(build.published_at, None);
	}

	#[test]
	fn missing_optional_timestamp_is_none() {
		let build: Build = decode_document(&json!({ "createdAt": "2020-01-01T00:00:00Z" }))
			.expect("Missing optional timestamps should decode.");

		assert_eq!(build.published_at, None);
		assert_eq!(
			serde_json::to_value(&build).expect("Build should serialize."),
			json!({ "createdAt": "2020-01-01T00:00:00Z", "publishedAt": null })
		);
	}

	#[test]
	fn malformed_timestamps_fail() {
		assert!(
			decode_document::<Build>(&json!({ "createdAt": "yesterday" })).is_err(),
			"Garbage timestamps should not decode."
		);
	}
}
