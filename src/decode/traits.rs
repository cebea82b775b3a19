//! Trait-token flags: short strings such as `p_linux` mapped onto named boolean fields.
//!
//! Types declared with [`trait_flags!`] decode from a token list (`["p_linux","has_demo"]`), from
//! a single token, or from a map of booleans keyed by token or camelCased token
//! (`{"pLinux":true}`). Unknown tokens are ignored and unmentioned flags stay `false`. They
//! serialize back to a token list in declaration order.

// std
use std::marker::PhantomData;
// crates.io
use serde::{
	Deserializer, Serializer,
	de::{Error as DeError, MapAccess, SeqAccess, Visitor},
	ser::SerializeSeq,
};
// self
use crate::{_prelude::*, decode::camelcase};

/// A fixed set of boolean flags addressed by trait token.
pub trait TraitFlags
where
	Self: Default,
{
	/// Tokens in declaration order.
	const TOKENS: &'static [&'static str];

	/// Returns the flag for `token`, or `None` for unknown tokens.
	fn flag(&self, token: &str) -> Option<bool>;

	/// Returns the flag slot for `token`, or `None` for unknown tokens.
	fn flag_mut(&mut self, token: &str) -> Option<&mut bool>;

	/// Returns the tokens whose flag is set, in declaration order.
	fn tokens(&self) -> Vec<&'static str> {
		Self::TOKENS.iter().copied().filter(|token| self.flag(token).unwrap_or(false)).collect()
	}

	/// Sets the flag named by `key`, which may be a token or its camelCased form.
	///
	/// Returns `false` for unknown keys.
	fn set(&mut self, key: &str, value: bool) -> bool {
		let token = Self::TOKENS.iter().copied().find(|token| *token == key || camelcase(token) == key);

		match token.and_then(|token| self.flag_mut(token)) {
			Some(slot) => {
				*slot = value;

				true
			},
			None => false,
		}
	}
}

/// Declares a [`TraitFlags`] struct with one `bool` field per token.
///
/// ```
/// itchio_api::trait_flags! {
/// 	/// Flags of a build channel.
/// 	pub struct ChannelTraits {
/// 		/// Channel is hidden from the store page.
/// 		hidden => "hidden",
/// 		/// Channel ships beta builds.
/// 		beta => "beta",
/// 	}
/// }
/// ```
#[macro_export]
macro_rules! trait_flags {
	(
		$(#[$meta:meta])*
		$vis:vis struct $name:ident {
			$(
				$(#[$field_meta:meta])*
				$field:ident => $token:literal
			),+ $(,)?
		}
	) => {
		$(#[$meta])*
		#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
		$vis struct $name {
			$(
				$(#[$field_meta])*
				pub $field: bool,
			)+
		}
		impl $crate::decode::TraitFlags for $name {
			const TOKENS: &'static [&'static str] = &[$($token),+];

			fn flag(&self, token: &str) -> Option<bool> {
				match token {
					$($token => Some(self.$field),)+
					_ => None,
				}
			}

			fn flag_mut(&mut self, token: &str) -> Option<&mut bool> {
				match token {
					$($token => Some(&mut self.$field),)+
					_ => None,
				}
			}
		}
		impl $crate::serde::Serialize for $name {
			fn serialize<S>(&self, serializer: S) -> ::core::result::Result<S::Ok, S::Error>
			where
				S: $crate::serde::Serializer,
			{
				$crate::decode::serialize_trait_flags(self, serializer)
			}
		}
		impl<'de> $crate::serde::Deserialize<'de> for $name {
			fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
			where
				D: $crate::serde::Deserializer<'de>,
			{
				$crate::decode::deserialize_trait_flags(deserializer)
			}
		}
	};
}

trait_flags! {
	/// Platform and commerce flags of a game.
	pub struct GameTraits {
		/// Has a Windows build.
		platform_windows => "p_windows",
		/// Has a Linux build.
		platform_linux => "p_linux",
		/// Has a macOS build.
		platform_osx => "p_osx",
		/// Has an Android build.
		platform_android => "p_android",
		/// Can be purchased.
		can_be_bought => "can_be_bought",
		/// Offers a demo.
		has_demo => "has_demo",
		/// Is part of the press system.
		in_press_system => "in_press_system",
	}
}

trait_flags! {
	/// Platform flags of an upload.
	pub struct UploadTraits {
		/// Runs on Windows.
		platform_windows => "p_windows",
		/// Runs on Linux.
		platform_linux => "p_linux",
		/// Runs on macOS.
		platform_osx => "p_osx",
		/// Runs on Android.
		platform_android => "p_android",
		/// Is a demo.
		demo => "demo",
	}
}

/// Serializes set flags as a token list in declaration order.
pub fn serialize_trait_flags<F, S>(flags: &F, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
	F: TraitFlags,
	S: Serializer,
{
	let tokens = flags.tokens();
	let mut seq = serializer.serialize_seq(Some(tokens.len()))?;

	for token in tokens {
		seq.serialize_element(token)?;
	}

	seq.end()
}

/// Deserializes flags from a token list, a single token, null, or a map of booleans.
pub fn deserialize_trait_flags<'de, F, D>(deserializer: D) -> std::result::Result<F, D::Error>
where
	F: TraitFlags,
	D: Deserializer<'de>,
{
	deserializer.deserialize_any(TraitFlagsVisitor(PhantomData))
}

struct TraitFlagsVisitor<F>(PhantomData<F>);
impl<'de, F> Visitor<'de> for TraitFlagsVisitor<F>
where
	F: TraitFlags,
{
	type Value = F;

	fn expecting(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("a list of trait tokens or a map of trait flags")
	}

	fn visit_unit<E>(self) -> std::result::Result<F, E>
	where
		E: DeError,
	{
		Ok(F::default())
	}

	fn visit_none<E>(self) -> std::result::Result<F, E>
	where
		E: DeError,
	{
		Ok(F::default())
	}

	fn visit_str<E>(self, token: &str) -> std::result::Result<F, E>
	where
		E: DeError,
	{
		let mut flags = F::default();

		flags.set(token, true);

		Ok(flags)
	}

	fn visit_seq<A>(self, mut seq: A) -> std::result::Result<F, A::Error>
	where
		A: SeqAccess<'de>,
	{
		let mut flags = F::default();

		while let Some(token) = seq.next_element::<String>()? {
			flags.set(&token, true);
		}

		Ok(flags)
	}

	fn visit_map<A>(self, mut map: A) -> std::result::Result<F, A::Error>
	where
		A: MapAccess<'de>,
	{
		let mut flags = F::default();

		while let Some((key, value)) = map.next_entry::<String, bool>()? {
			flags.set(&key, value);
		}

		Ok(flags)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::decode::decode_document;

	#[derive(Debug, Deserialize)]
	#[serde(rename_all = "camelCase")]
	struct Game {
		title: String,
		traits: GameTraits,
	}

	#[test]
	fn token_list_sets_matching_flags_only() {
		let game: Game = decode_document(&json!({
			"title": "Unreal",
			"traits": ["p_linux", "can_be_bought", "p_amiga"],
		}))
		.expect("Trait tokens should decode.");

		assert_eq!(game.title, "Unreal");
		assert_eq!(
			game.traits,
			GameTraits { platform_linux: true, can_be_bought: true, ..Default::default() }
		);
	}

	#[test]
	fn flags_serialize_in_declaration_order() {
		let traits = GameTraits { has_demo: true, platform_android: true, ..Default::default() };

		assert_eq!(
			serde_json::to_string(&traits).expect("Traits should serialize."),
			r#"["p_android","has_demo"]"#
		);

		let back: GameTraits = serde_json::from_str(r#"["p_android","has_demo"]"#)
			.expect("Serialized traits should decode.");

		assert_eq!(back, traits);
	}

	#[test]
	fn boolean_maps_accept_tokens_and_camel_case_keys() {
		let traits: UploadTraits = decode_document(&json!({ "pWindows": true, "demo": 1, "p_osx": true }))
			.expect("Boolean maps should decode.");

		assert_eq!(
			traits,
			UploadTraits { platform_windows: true, platform_osx: true, demo: true, ..Default::default() }
		);
	}

	#[test]
	fn null_and_single_tokens_decode() {
		let none: UploadTraits = decode_document(&json!(null)).expect("Null should decode.");
		let one: UploadTraits = decode_document(&json!("demo")).expect("A single token should decode.");

		assert_eq!(none, UploadTraits::default());
		assert!(one.demo);
	}
}
