use crate::dsl::Query;
use cirrus_config::Scoring;

pub const FILETYPE_KEYWORD: &str = "filetype";

/// Filter for a `filetype:<value>` keyword; `None` when the value is blank.
pub fn filetype_filter(value: &str, scoring: &Scoring) -> Option<Query> {
	let value = value.trim();

	if value.is_empty() {
		return None;
	}

	let media_type = scoring.filetype_aliases.get(value).map(String::as_str).unwrap_or(value);

	Some(Query::match_text("file_media_type", media_type))
}

/// Splits `filetype:<value>` into its value, ignoring keywords of other kinds.
pub fn parse_keyword(raw: &str) -> Option<&str> {
	let (keyword, value) = raw.split_once(':')?;

	keyword.trim().eq_ignore_ascii_case(FILETYPE_KEYWORD).then_some(value)
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use crate::filetype::{filetype_filter, parse_keyword};
	use cirrus_config::Scoring;

	#[test]
	fn resolves_aliases() {
		let scoring = Scoring {
			filetype_aliases: BTreeMap::from([("jpg".to_string(), "bitmap".to_string())]),
			..Scoring::default()
		};

		assert_eq!(
			filetype_filter("jpg", &scoring).map(|query| query.to_value()),
			Some(serde_json::json!({ "match": { "file_media_type": { "query": "bitmap" } } }))
		);
		assert_eq!(
			filetype_filter(" audio ", &scoring).map(|query| query.to_value()),
			Some(serde_json::json!({ "match": { "file_media_type": { "query": "audio" } } }))
		);
		assert!(filetype_filter("  ", &scoring).is_none());
	}

	#[test]
	fn parses_only_filetype_keywords() {
		assert_eq!(parse_keyword("filetype:drawing"), Some("drawing"));
		assert_eq!(parse_keyword("FileType:bitmap"), Some("bitmap"));
		assert_eq!(parse_keyword("intitle:foo"), None);
		assert_eq!(parse_keyword("bitmap"), None);
	}
}
