//! Shared fixtures for the workspace's integration tests.

use serde_json::Value;

use cirrus_config::Config;

/// A configuration covering every completion and rescore feature.
pub const SAMPLE_CONFIG_TOML: &str = include_str!("../fixtures/sample_config.toml");

pub fn sample_config() -> Config {
	cirrus_config::parse(SAMPLE_CONFIG_TOML).expect("Sample config must be valid.")
}

/// Sample configuration with `edit` applied to the raw TOML before parsing.
pub fn sample_config_with(edit: impl FnOnce(&str) -> String) -> cirrus_config::Result<Config> {
	cirrus_config::parse(&edit(SAMPLE_CONFIG_TOML))
}

/// One completion-suggester option as the engine returns it.
pub fn completion_option(id: &str, score: f64, text: &str) -> Value {
	serde_json::json!({ "text": text, "_id": id, "_score": score })
}

/// A completion option whose document points at `title` in `namespace`.
pub fn completion_option_with_target(
	id: &str,
	score: f64,
	text: &str,
	title: &str,
	namespace: i32,
) -> Value {
	serde_json::json!({
		"text": text,
		"_id": id,
		"_score": score,
		"_source": { "target_title": { "title": title, "namespace": namespace } }
	})
}

/// Wraps `(sub-query name, options)` pairs into a search response with a `suggest` section.
pub fn suggest_response<'a, I>(sections: I) -> Value
where
	I: IntoIterator<Item = (&'a str, Vec<Value>)>,
{
	let mut suggest = serde_json::Map::new();

	for (name, options) in sections {
		suggest.insert(
			name.to_string(),
			serde_json::json!([{ "text": "", "offset": 0, "length": 0, "options": options }]),
		);
	}

	serde_json::json!({ "took": 3, "timed_out": false, "suggest": suggest })
}
