// crates.io
use serde::Deserialize;
use url::Url;
// self
use itchio_api::{
	decode::{self, GameTraits, TraitFlags, UploadTraits},
	error::{DecodeError, Error},
	request::RawResponse,
	trait_flags,
};

trait_flags! {
	/// Flags of a build channel.
	pub struct ChannelTraits {
		/// Channel is hidden from the store page.
		hidden => "hidden",
		/// Channel ships beta builds.
		beta => "is_beta",
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameResponse {
	game: Game,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Game {
	id: u64,
	title: String,
	min_price: i64,
	traits: GameTraits,
	#[serde(with = "itchio_api::decode::timestamp")]
	published_at: time::OffsetDateTime,
	uploads: Vec<Upload>,
	#[serde(default)]
	channels: std::collections::BTreeMap<String, ChannelTraits>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Upload {
	id: u64,
	display_name: String,
	traits: UploadTraits,
}

fn response(status: u16, body: &str) -> Option<RawResponse> {
	Some(RawResponse {
		status,
		url: Url::parse("https://api.itch.io/games/3").expect("Fixture URL should parse."),
		body: Some(body.as_bytes().to_vec()),
	})
}

#[test]
fn game_payload_decodes_end_to_end() {
	let parsed = decode::parse_api_response::<GameResponse>(response(
		200,
		r#"{
			"game": {
				"id": 3,
				"title": "X-Moon",
				"min_price": "500",
				"traits": ["p_linux", "can_be_bought", "p_beos"],
				"published_at": "2017-05-23T15:44:02.000000Z",
				"uploads": [
					{ "id": "10", "display_name": "x-moon-linux.zip", "traits": ["p_linux", "demo"] },
					{ "id": 11, "display_name": 2017, "traits": { "p_windows": true } }
				],
				"channels": { "linux-beta": ["is_beta"], "old": { "hidden": "true" } }
			}
		}"#,
	))
	.expect("Game payload should decode.");
	let game = parsed.game;

	assert_eq!(game.id, 3);
	assert_eq!(game.title, "X-Moon");
	assert_eq!(game.min_price, 500);
	assert_eq!(game.traits.tokens(), ["p_linux", "can_be_bought"]);
	assert_eq!(game.published_at.year(), 2017);
	assert_eq!(game.uploads[0].id, 10);
	assert!(game.uploads[0].traits.platform_linux && game.uploads[0].traits.demo);
	assert_eq!(game.uploads[1].display_name, "2017");
	assert!(game.uploads[1].traits.platform_windows);
	assert!(game.channels["linux-beta"].beta);
	assert!(game.channels["old"].hidden);
}

#[test]
fn empty_object_encoded_as_array_decodes() {
	let parsed = decode::parse_api_response::<GameResponse>(response(
		200,
		r#"{"game":{"id":1,"title":"t","min_price":0,"traits":[],"published_at":"2020-01-01T00:00:00Z","uploads":[],"channels":[]}}"#,
	))
	.expect("Empty arrays in place of objects should decode.");

	assert!(parsed.game.channels.is_empty());
	assert_eq!(parsed.game.traits, GameTraits::default());
}

#[test]
fn missing_body_is_reported() {
	let err = decode::parse_api_response::<GameResponse>(Some(RawResponse {
		status: 204,
		url: Url::parse("https://api.itch.io/games/3").expect("Fixture URL should parse."),
		body: None,
	}))
	.expect_err("Bodyless responses should fail.");

	assert!(matches!(err, Error::Decode(DecodeError::MissingBody)));
}

#[test]
fn custom_flags_round_trip_through_tokens() {
	let traits = ChannelTraits { hidden: false, beta: true };

	assert_eq!(ChannelTraits::TOKENS, ["hidden", "is_beta"]);
	assert_eq!(serde_json::to_string(&traits).expect("Flags should serialize."), r#"["is_beta"]"#);
}
