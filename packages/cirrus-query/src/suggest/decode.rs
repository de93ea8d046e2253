use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
	Error, Result,
	suggest::{CompiledSuggest, CompletionRequestLog},
};

const MAIN_NAMESPACE: i32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
	Title,
	Redirect,
	Other(char),
}
impl SuggestionKind {
	fn from_char(kind: char) -> Self {
		match kind {
			't' => Self::Title,
			'r' => Self::Redirect,
			other => Self::Other(other),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Suggestion {
	pub page_id: u64,
	pub score: f64,
	pub text: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub namespace: Option<i32>,
	pub kind: SuggestionKind,
	/// Name of the sub-query that produced the surviving hit.
	pub profile: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SuggestionSet {
	pub suggestions: Vec<Suggestion>,
}
impl SuggestionSet {
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.suggestions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.suggestions.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &Suggestion> {
		self.suggestions.iter()
	}

	pub fn page_ids(&self) -> Vec<u64> {
		self.suggestions.iter().map(|suggestion| suggestion.page_id).collect()
	}
}

#[derive(Debug, Deserialize)]
struct SuggestEntry {
	#[serde(default)]
	options: Vec<SuggestOption>,
}

#[derive(Debug, Deserialize)]
struct SuggestOption {
	text: String,
	#[serde(rename = "_id")]
	id: String,
	#[serde(rename = "_score")]
	score: f64,
	#[serde(rename = "_source", default)]
	source: Option<OptionSource>,
}

#[derive(Debug, Default, Deserialize)]
struct OptionSource {
	target_title: Option<TargetTitle>,
}

#[derive(Debug, Deserialize)]
struct TargetTitle {
	title: String,
	namespace: i32,
}

/// Splits a compact completion id into the page id and the trailing kind marker.
pub fn decode_id(id: &str) -> Option<(u64, SuggestionKind)> {
	let marker = id.chars().last()?;
	let page_id = id[..id.len() - marker.len_utf8()].parse().ok()?;

	Some((page_id, SuggestionKind::from_char(marker)))
}

impl CompiledSuggest {
	pub fn decode(
		&self,
		response: &Value,
		index_name: &str,
		log: &mut CompletionRequestLog,
	) -> Result<SuggestionSet> {
		log.set_response(response.clone());

		let suggest = match response.get("suggest") {
			None | Some(Value::Null) => return Ok(SuggestionSet::empty()),
			Some(Value::Object(suggest)) => suggest,
			Some(_) => return Err(Error::invalid_response("suggest must be an object.")),
		};

		if suggest.is_empty() {
			return Ok(SuggestionSet::empty());
		}

		for name in suggest.keys() {
			if self.discount(name).is_none() {
				tracing::warn!(name = %name, "Ignoring suggest section that was not compiled.");
			}
		}

		let mut ranked: Vec<Suggestion> = Vec::new();
		let mut by_page: HashMap<u64, usize> = HashMap::new();
		let mut hits_total = 0_usize;

		for query in &self.queries {
			let Some(raw) = suggest.get(&query.name) else {
				continue;
			};
			let discount = self.discount(&query.name).unwrap_or(1.0);
			let entries: Vec<SuggestEntry> =
				serde_json::from_value(raw.clone()).map_err(|err| {
					Error::invalid_response(format!("suggest.{}: {err}.", query.name))
				})?;

			for option in entries.into_iter().flat_map(|entry| entry.options) {
				hits_total += 1;

				let Some((page_id, kind)) = decode_id(&option.id) else {
					tracing::warn!(id = %option.id, name = %query.name, "Skipping undecodable completion id.");

					continue;
				};
				let score = discount * option.score;

				if let Some(&slot) = by_page.get(&page_id)
					&& ranked[slot].score >= score
				{
					continue;
				}

				let target = option.source.and_then(|source| source.target_title);
				let namespace = target.as_ref().map(|target| target.namespace);
				let text = match target {
					Some(target)
						if kind == SuggestionKind::Title && target.namespace == MAIN_NAMESPACE =>
						target.title,
					_ => option.text,
				};
				let suggestion =
					Suggestion { page_id, score, text, namespace, kind, profile: query.name.clone() };

				match by_page.get(&page_id) {
					Some(&slot) => ranked[slot] = suggestion,
					None => {
						by_page.insert(page_id, ranked.len());
						ranked.push(suggestion);
					},
				}
			}
		}

		ranked.sort_by(|left, right| right.score.total_cmp(&left.score));

		let offset = self.offset as usize;
		let hard_limit = self.hard_limit as usize;
		let suggestions: Vec<Suggestion> = if offset < hard_limit {
			ranked.into_iter().skip(offset).take(hard_limit - offset).collect()
		} else {
			Vec::new()
		};

		log.set_result(index_name, hits_total, &suggestions);

		tracing::info!(
			index = index_name,
			hits_total,
			returned = suggestions.len(),
			offset = self.offset,
			hard_limit = self.hard_limit,
			"Completion response decoded."
		);

		Ok(SuggestionSet { suggestions })
	}
}
