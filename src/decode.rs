//! Response decoding: error envelopes, key normalization, and forgiving typed decoding.
//!
//! The API mixes snake_case and camelCase keys, emits numbers where strings are expected (and
//! the other way around), and encodes empty objects as `[]`. [`parse_api_response`] first
//! classifies the response (missing body, structured `errors`, bare HTTP status), then rewrites
//! every key to camelCase and decodes through [`WeakDeserializer`], which coerces scalars the way
//! the server's sloppiness requires. Destination types therefore use
//! `#[serde(rename_all = "camelCase")]` regardless of what the wire said.

pub mod timestamp;

mod traits;
mod weak;

pub use traits::*;
pub use weak::*;

// crates.io
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	error::{ApiError, DecodeError},
	request::RawResponse,
};

/// Turns a transport response into `T` or a classified error.
///
/// Structured `errors` take precedence over the HTTP status, and the HTTP status takes
/// precedence over a body that fails to parse.
pub fn parse_api_response<T>(response: Option<RawResponse>) -> Result<T>
where
	T: DeserializeOwned,
{
	let Some(response) = response else {
		return Err(DecodeError::MissingBody.into());
	};
	let success = response.is_success();
	let RawResponse { status, url, body: Some(body) } = response else {
		return Err(DecodeError::MissingBody.into());
	};
	let http_status = || Error::HttpStatus { status, path: url.path().to_owned() };
	let document = match serde_json::from_slice::<Map<String, Value>>(&body) {
		Ok(document) => document,
		Err(_) if !success => return Err(http_status()),
		Err(source) =>
			return Err(DecodeError::Json {
				source,
				body: String::from_utf8_lossy(&body).into_owned(),
			}
			.into()),
	};

	if let Some(messages) = error_messages(&document) {
		return Err(ApiError { status, path: url.path().to_owned(), messages }.into());
	}
	if !success {
		return Err(http_status());
	}

	decode_document(&camelify(Value::Object(document)))
}

/// Decodes an already-normalized document into `T` with weak typing.
///
/// The document is only rendered back to text when decoding fails.
pub fn decode_document<T>(document: &Value) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(WeakDeserializer::new(document))
		.map_err(|source| DecodeError::Shape { source, document: document.to_string() }.into())
}

/// Converts a snake_case key to camelCase; the first segment is kept verbatim.
pub fn camelcase(key: &str) -> String {
	let mut segments = key.split('_');
	let mut out = String::with_capacity(key.len());

	if let Some(first) = segments.next() {
		out.push_str(first);
	}

	for segment in segments {
		let mut chars = segment.chars();

		if let Some(head) = chars.next() {
			out.extend(head.to_uppercase());
			out.push_str(chars.as_str());
		}
	}

	out
}

/// Rewrites every object key to camelCase at every depth, including inside arrays.
///
/// When two keys collide after rewriting, the one that sorts later in the source object wins.
pub fn camelify(value: Value) -> Value {
	match value {
		Value::Object(map) =>
			Value::Object(map.into_iter().map(|(key, value)| (camelcase(&key), camelify(value))).collect()),
		Value::Array(items) => Value::Array(items.into_iter().map(camelify).collect()),
		scalar => scalar,
	}
}

fn error_messages(document: &Map<String, Value>) -> Option<Vec<String>> {
	let messages = document
		.get("errors")?
		.as_array()?
		.iter()
		.filter_map(|message| message.as_str().map(ToOwned::to_owned))
		.collect::<Vec<_>>();

	(!messages.is_empty()).then_some(messages)
}
