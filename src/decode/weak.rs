//! A [`Deserializer`] over a borrowed [`Value`] that coerces scalars instead of rejecting them.
//!
//! | destination | accepted input |
//! | --- | --- |
//! | string | string, number (`1.5` → `"1.5"`), bool (`"1"`/`"0"`), null (`""`) |
//! | integer | number (floats truncate), numeric string, `""` (0), bool (1/0), null (0) |
//! | float | number, numeric string, `""` (0), bool (1/0), null (0) |
//! | bool | bool, number (non-zero), `1 t T TRUE true True 0 f F FALSE false False`, `""`, null |
//! | sequence | array, null (empty), any single value (one element) |
//! | map / struct | object, null or empty array (empty) |
//!
//! Everything else is decoded strictly.

// std
use std::slice::{self, Iter as SliceIter};
// crates.io
use serde::{
	Deserializer,
	de::{
		DeserializeSeed, Error as _, IntoDeserializer, MapAccess, SeqAccess, Unexpected, Visitor,
		value::BorrowedStrDeserializer,
	},
	forward_to_deserialize_any,
};
use serde_json::{Error as JsonError, Map, Number, Value, map::Iter as MapIter};

type WeakResult<T> = std::result::Result<T, JsonError>;

/// Weakly typed deserializer over a borrowed JSON document.
#[derive(Clone, Copy, Debug)]
pub struct WeakDeserializer<'de> {
	value: &'de Value,
}
impl<'de> WeakDeserializer<'de> {
	/// Wraps `value`.
	pub fn new(value: &'de Value) -> Self {
		Self { value }
	}

	fn integer<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		match self.value {
			Value::Number(number) => visit_number_as_integer(number, visitor),
			Value::Bool(flag) => visitor.visit_u64(u64::from(*flag)),
			Value::Null => visitor.visit_u64(0),
			Value::String(text) => visit_str_as_integer(text, visitor),
			_ => self.deserialize_any(visitor),
		}
	}

	fn float<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		match self.value {
			Value::Number(number) => visitor.visit_f64(number.as_f64().unwrap_or_default()),
			Value::Bool(flag) => visitor.visit_f64(if *flag { 1.0 } else { 0.0 }),
			Value::Null => visitor.visit_f64(0.0),
			Value::String(text) => visit_str_as_float(text, visitor),
			_ => self.deserialize_any(visitor),
		}
	}
}
impl<'de> Deserializer<'de> for WeakDeserializer<'de> {
	type Error = JsonError;

	fn deserialize_any<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		match self.value {
			Value::Null => visitor.visit_unit(),
			Value::Bool(flag) => visitor.visit_bool(*flag),
			Value::Number(number) =>
				if let Some(unsigned) = number.as_u64() {
					visitor.visit_u64(unsigned)
				} else if let Some(signed) = number.as_i64() {
					visitor.visit_i64(signed)
				} else {
					visitor.visit_f64(number.as_f64().unwrap_or_default())
				},
			Value::String(text) => visitor.visit_borrowed_str(text),
			Value::Array(items) => visitor.visit_seq(WeakSeq::new(items)),
			Value::Object(entries) => visitor.visit_map(WeakMap::new(Some(entries))),
		}
	}

	fn deserialize_bool<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		match self.value {
			Value::Bool(flag) => visitor.visit_bool(*flag),
			Value::Null => visitor.visit_bool(false),
			Value::Number(number) =>
				visitor.visit_bool(number.as_f64().is_some_and(|float| float != 0.0)),
			Value::String(text) => visit_str_as_bool(text, visitor),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_i8<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.integer(visitor)
	}

	fn deserialize_i16<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.integer(visitor)
	}

	fn deserialize_i32<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.integer(visitor)
	}

	fn deserialize_i64<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.integer(visitor)
	}

	fn deserialize_u8<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.integer(visitor)
	}

	fn deserialize_u16<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.integer(visitor)
	}

	fn deserialize_u32<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.integer(visitor)
	}

	fn deserialize_u64<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.integer(visitor)
	}

	fn deserialize_f32<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.float(visitor)
	}

	fn deserialize_f64<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.float(visitor)
	}

	fn deserialize_char<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.deserialize_string(visitor)
	}

	fn deserialize_str<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.deserialize_string(visitor)
	}

	fn deserialize_string<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		match self.value {
			Value::String(text) => visitor.visit_borrowed_str(text),
			Value::Number(number) => visitor.visit_string(number.to_string()),
			Value::Bool(flag) => visitor.visit_str(if *flag { "1" } else { "0" }),
			Value::Null => visitor.visit_str(""),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_bytes<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		Deserializer::deserialize_bytes(self.value, visitor)
	}

	fn deserialize_byte_buf<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		Deserializer::deserialize_byte_buf(self.value, visitor)
	}

	fn deserialize_option<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		match self.value {
			Value::Null => visitor.visit_none(),
			_ => visitor.visit_some(self),
		}
	}

	fn deserialize_unit<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		match self.value {
			Value::Null => visitor.visit_unit(),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.deserialize_unit(visitor)
	}

	fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visitor.visit_newtype_struct(self)
	}

	fn deserialize_seq<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		match self.value {
			Value::Array(items) => visitor.visit_seq(WeakSeq::new(items)),
			Value::Null => visitor.visit_seq(WeakSeq::new(&[])),
			single => visitor.visit_seq(WeakSeq::new(slice::from_ref(single))),
		}
	}

	fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.deserialize_seq(visitor)
	}

	fn deserialize_tuple_struct<V>(
		self,
		_name: &'static str,
		_len: usize,
		visitor: V,
	) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.deserialize_seq(visitor)
	}

	fn deserialize_map<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		match self.value {
			Value::Object(entries) => visitor.visit_map(WeakMap::new(Some(entries))),
			Value::Null => visitor.visit_map(WeakMap::new(None)),
			Value::Array(items) if items.is_empty() => visitor.visit_map(WeakMap::new(None)),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_struct<V>(
		self,
		_name: &'static str,
		_fields: &'static [&'static str],
		visitor: V,
	) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.deserialize_map(visitor)
	}

	fn deserialize_enum<V>(
		self,
		name: &'static str,
		variants: &'static [&'static str],
		visitor: V,
	) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		Deserializer::deserialize_enum(self.value, name, variants, visitor)
	}

	fn deserialize_identifier<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		self.deserialize_string(visitor)
	}

	fn deserialize_ignored_any<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visitor.visit_unit()
	}
}
impl<'de> IntoDeserializer<'de, JsonError> for WeakDeserializer<'de> {
	type Deserializer = Self;

	fn into_deserializer(self) -> Self::Deserializer {
		self
	}
}

/// Sequence access yielding weakly typed elements.
#[derive(Debug)]
pub struct WeakSeq<'de> {
	items: SliceIter<'de, Value>,
}
impl<'de> WeakSeq<'de> {
	fn new(items: &'de [Value]) -> Self {
		Self { items: items.iter() }
	}
}
impl<'de> SeqAccess<'de> for WeakSeq<'de> {
	type Error = JsonError;

	fn next_element_seed<T>(&mut self, seed: T) -> WeakResult<Option<T::Value>>
	where
		T: DeserializeSeed<'de>,
	{
		self.items.next().map(|item| seed.deserialize(WeakDeserializer::new(item))).transpose()
	}

	fn size_hint(&self) -> Option<usize> {
		Some(self.items.len())
	}
}

/// Map access yielding weakly typed keys and values.
///
/// Keys go through the same coercions, so numeric map keys decode from their string form.
#[derive(Debug)]
pub struct WeakMap<'de> {
	entries: Option<MapIter<'de>>,
	pending: Option<&'de Value>,
	remaining: usize,
}
impl<'de> WeakMap<'de> {
	fn new(entries: Option<&'de Map<String, Value>>) -> Self {
		Self {
			remaining: entries.map_or(0, Map::len),
			entries: entries.map(Map::iter),
			pending: None,
		}
	}
}
impl<'de> MapAccess<'de> for WeakMap<'de> {
	type Error = JsonError;

	fn next_key_seed<K>(&mut self, seed: K) -> WeakResult<Option<K::Value>>
	where
		K: DeserializeSeed<'de>,
	{
		let Some((key, value)) = self.entries.as_mut().and_then(Iterator::next) else {
			return Ok(None);
		};

		self.pending = Some(value);
		self.remaining -= 1;

		seed.deserialize(WeakKey(key)).map(Some)
	}

	fn next_value_seed<V>(&mut self, seed: V) -> WeakResult<V::Value>
	where
		V: DeserializeSeed<'de>,
	{
		let value = self.pending.take().ok_or_else(|| JsonError::custom("value is missing"))?;

		seed.deserialize(WeakDeserializer::new(value))
	}

	fn size_hint(&self) -> Option<usize> {
		Some(self.remaining)
	}
}

/// Object key, coerced like a string value.
struct WeakKey<'de>(&'de str);
impl<'de> Deserializer<'de> for WeakKey<'de> {
	type Error = JsonError;

	fn deserialize_any<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visitor.visit_borrowed_str(self.0)
	}

	fn deserialize_bool<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visit_str_as_bool(self.0, visitor)
	}

	fn deserialize_i8<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visit_str_as_integer(self.0, visitor)
	}

	fn deserialize_i16<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visit_str_as_integer(self.0, visitor)
	}

	fn deserialize_i32<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visit_str_as_integer(self.0, visitor)
	}

	fn deserialize_i64<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visit_str_as_integer(self.0, visitor)
	}

	fn deserialize_u8<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visit_str_as_integer(self.0, visitor)
	}

	fn deserialize_u16<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visit_str_as_integer(self.0, visitor)
	}

	fn deserialize_u32<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visit_str_as_integer(self.0, visitor)
	}

	fn deserialize_u64<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visit_str_as_integer(self.0, visitor)
	}

	fn deserialize_f32<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visit_str_as_float(self.0, visitor)
	}

	fn deserialize_f64<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visit_str_as_float(self.0, visitor)
	}

	fn deserialize_option<V>(self, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visitor.visit_some(self)
	}

	fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visitor.visit_newtype_struct(self)
	}

	fn deserialize_enum<V>(
		self,
		_name: &'static str,
		_variants: &'static [&'static str],
		visitor: V,
	) -> WeakResult<V::Value>
	where
		V: Visitor<'de>,
	{
		visitor.visit_enum(BorrowedStrDeserializer::<JsonError>::new(self.0))
	}

	forward_to_deserialize_any! {
		char str string bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
		identifier ignored_any
	}
}

fn visit_number_as_integer<'de, V>(number: &Number, visitor: V) -> WeakResult<V::Value>
where
	V: Visitor<'de>,
{
	if let Some(unsigned) = number.as_u64() {
		return visitor.visit_u64(unsigned);
	}
	if let Some(signed) = number.as_i64() {
		return visitor.visit_i64(signed);
	}

	let float = number.as_f64().unwrap_or_default().trunc();

	if float >= 0.0 { visitor.visit_u64(float as u64) } else { visitor.visit_i64(float as i64) }
}

fn visit_str_as_integer<'de, V>(text: &str, visitor: V) -> WeakResult<V::Value>
where
	V: Visitor<'de>,
{
	if text.is_empty() {
		visitor.visit_u64(0)
	} else if let Ok(unsigned) = text.parse::<u64>() {
		visitor.visit_u64(unsigned)
	} else if let Ok(signed) = text.parse::<i64>() {
		visitor.visit_i64(signed)
	} else {
		Err(JsonError::invalid_value(Unexpected::Str(text), &"an integer"))
	}
}

fn visit_str_as_float<'de, V>(text: &str, visitor: V) -> WeakResult<V::Value>
where
	V: Visitor<'de>,
{
	if text.is_empty() {
		return visitor.visit_f64(0.0);
	}

	match text.parse::<f64>() {
		Ok(float) => visitor.visit_f64(float),
		Err(_) => Err(JsonError::invalid_value(Unexpected::Str(text), &"a number")),
	}
}

fn visit_str_as_bool<'de, V>(text: &str, visitor: V) -> WeakResult<V::Value>
where
	V: Visitor<'de>,
{
	match text {
		"1" | "t" | "T" | "TRUE" | "true" | "True" => visitor.visit_bool(true),
		"" | "0" | "f" | "F" | "FALSE" | "false" | "False" => visitor.visit_bool(false),
		_ => Err(JsonError::invalid_value(Unexpected::Str(text), &"a boolean")),
	}
}


#[cfg(test)]
mod tests {
	// std
	use std::collections::BTreeMap;
	// crates.io
	use serde::Deserialize;
	use serde_json::json;
	// self
	use super::*;

	fn weak<T>(value: Value) -> WeakResult<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		T::deserialize(WeakDeserializer::new(&value))
	}

	#[derive(Debug, Default, Deserialize, PartialEq)]
	#[serde(rename_all = "camelCase")]
	struct Upload {
		id: u64,
		filename: String,
		size: i64,
		demo: bool,
		min_price: f64,
		tags: Vec<String>,
		#[serde(default)]
		build_id: Option<u64>,
	}

	#[test]
	fn scalars_coerce_into_their_destinations() {
		let upload: Upload = weak(json!({
			"id": "12",
			"filename": 404,
			"size": 10.9,
			"demo": "true",
			"minPrice": "2.5",
			"tags": "single",
			"buildId": "7",
		}))
		.expect("Weakly typed upload should decode.");

		assert_eq!(
			upload,
			Upload {
				id: 12,
				filename: "404".into(),
				size: 10,
				demo: true,
				min_price: 2.5,
				tags: vec!["single".into()],
				build_id: Some(7),
			}
		);
	}

	#[test]
	fn nulls_and_blanks_become_zero_values() {
		let upload: Upload = weak(json!({
			"id": null,
			"filename": null,
			"size": "",
			"demo": "",
			"minPrice": null,
			"tags": null,
			"buildId": null,
		}))
		.expect("Null fields should decode as zero values.");

		assert_eq!(upload, Upload::default());
	}

	#[test]
	fn bools_become_digits_and_numbers_become_bools() {
		assert_eq!(weak::<String>(json!(true)).expect("Bool should stringify."), "1");
		assert_eq!(weak::<String>(json!(false)).expect("Bool should stringify."), "0");
		assert!(weak::<bool>(json!(2)).expect("Non-zero should be true."));
		assert!(!weak::<bool>(json!(0.0)).expect("Zero should be false."));
		assert_eq!(weak::<u8>(json!(true)).expect("Bool should count."), 1);
		assert!(weak::<bool>(json!("maybe")).is_err());
		assert!(weak::<u32>(json!("1.5")).is_err());
	}

	#[test]
	fn empty_arrays_decode_as_empty_maps() {
		let map: BTreeMap<String, u64> = weak(json!([])).expect("Empty array should be an empty map.");

		assert!(map.is_empty());
	}

	#[test]
	fn numeric_keys_decode_from_strings() {
		let map: BTreeMap<u64, String> =
			weak(json!({ "3": 1, "10": "x" })).expect("Numeric keys should decode.");

		assert_eq!(map.get(&3).map(String::as_str), Some("1"));
		assert_eq!(map.get(&10).map(String::as_str), Some("x"));
	}

	#[test]
	fn range_errors_still_surface() {
		assert!(weak::<u8>(json!(300)).is_err());
		assert!(weak::<u32>(json!(-1)).is_err());
	}
}
