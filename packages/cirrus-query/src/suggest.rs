pub mod decode;
pub mod log;

pub use decode::{Suggestion, SuggestionKind, SuggestionSet};
pub use log::{CompletionRequestLog, LoggedSuggestion};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{Error, Result, dsl};
use cirrus_config::{Completion, Fuzzy, SuggestSource};

/// Extra discount applied to variant sources, divided by the variant's 1-based index.
pub const VARIANT_EXTRA_DISCOUNT: f64 = 0.0001;

/// One named completion-suggester sub-query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletionQuery {
	pub name: String,
	pub field: String,
	pub prefix: String,
	pub size: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fuzzy: Option<Fuzzy>,
}
impl CompletionQuery {
	pub fn to_value(&self) -> Value {
		let mut completion = Map::new();

		completion.insert("field".to_string(), Value::String(self.field.clone()));
		completion.insert("size".to_string(), Value::from(self.size));

		if let Some(fuzzy) = &self.fuzzy {
			completion.insert("fuzzy".to_string(), fuzzy_value(fuzzy));
		}

		serde_json::json!({ "prefix": self.prefix, "completion": completion })
	}
}

fn fuzzy_value(fuzzy: &Fuzzy) -> Value {
	let mut output = Map::new();

	if let Some(fuzziness) = &fuzzy.fuzziness {
		output.insert("fuzziness".to_string(), fuzziness.clone());
	}
	if let Some(transpositions) = fuzzy.transpositions {
		output.insert("transpositions".to_string(), Value::Bool(transpositions));
	}
	if let Some(min_length) = fuzzy.min_length {
		output.insert("min_length".to_string(), Value::from(min_length));
	}
	if let Some(prefix_length) = fuzzy.prefix_length {
		output.insert("prefix_length".to_string(), Value::from(prefix_length));
	}
	if let Some(unicode_aware) = fuzzy.unicode_aware {
		output.insert("unicode_aware".to_string(), Value::Bool(unicode_aware));
	}

	Value::Object(output)
}

/// The output of [`CompletionQueryBuilder::build`], consumed again by the decoder.
#[derive(Clone, Debug)]
pub struct CompiledSuggest {
	queries: Vec<CompletionQuery>,
	profiles: Vec<SuggestSource>,
	offset: u32,
	hard_limit: u32,
}
impl CompiledSuggest {
	pub fn queries(&self) -> &[CompletionQuery] {
		&self.queries
	}

	/// Base sources followed by the variant sources that produced a sub-query.
	pub fn merged_profiles(&self) -> &[SuggestSource] {
		&self.profiles
	}

	pub fn source(&self, name: &str) -> Option<&SuggestSource> {
		self.profiles.iter().find(|source| source.name == name)
	}

	pub fn discount(&self, name: &str) -> Option<f64> {
		self.source(name).map(|source| source.discount)
	}

	pub fn is_empty(&self) -> bool {
		self.queries.is_empty()
	}

	pub fn offset(&self) -> u32 {
		self.offset
	}

	pub fn hard_limit(&self) -> u32 {
		self.hard_limit
	}

	pub fn results_possible(&self) -> bool {
		self.offset < self.hard_limit
	}

	pub fn to_request(&self) -> Value {
		let mut suggest = Map::new();

		for query in &self.queries {
			suggest.insert(query.name.clone(), query.to_value());
		}

		dsl::keyed("suggest", Value::Object(suggest))
	}

	/// blake3 digest of the rendered request body.
	pub fn fingerprint(&self) -> String {
		let body = self.to_request().to_string();

		blake3::hash(body.as_bytes()).to_hex().to_string()
	}
}

pub struct CompletionQueryBuilder<'a> {
	profile: &'a [SuggestSource],
	settings: &'a Completion,
	offset: u32,
	hard_limit: u32,
}
impl<'a> CompletionQueryBuilder<'a> {
	pub fn new(profile: &'a [SuggestSource], limit: u32, offset: u32, settings: &'a Completion) -> Self {
		let hard_limit = compute_hard_limit(limit, offset, settings.hard_limit_ceiling());

		Self { profile, settings, offset, hard_limit }
	}

	pub fn hard_limit(&self) -> u32 {
		self.hard_limit
	}

	pub fn are_results_possible(&self) -> bool {
		self.offset < self.hard_limit
	}

	pub fn build(&self, term: &str, variants: &[String]) -> Result<CompiledSuggest> {
		if let Some(limit) = self.settings.max_request_chars {
			let length = term.chars().count();

			if length > limit {
				return Err(Error::RequestTooLong { length, limit });
			}
		}

		let max_input_length = self.settings.max_input_length;
		let truncated = truncate_chars(term, max_input_length);
		let query_len = truncated.trim_ascii().chars().count();
		let mut queries = Vec::new();
		let mut profiles = self.profile.to_vec();
		let mut gated = 0_usize;

		for source in self.profile {
			match self.compile_source(source, truncated, query_len) {
				Some(query) => queries.push(query),
				None => gated += 1,
			}
		}

		let mut seen = vec![term];
		let mut variant_index = 0_u32;

		for variant in variants {
			if seen.contains(&variant.as_str()) {
				continue;
			}

			seen.push(variant.as_str());

			variant_index += 1;

			let text = truncate_chars(variant, max_input_length);

			for source in self.profile {
				let derived = variant_source(source, variant_index);

				if let Some(query) = self.compile_source(&derived, text, query_len) {
					queries.push(query);
					profiles.push(derived);
				}
			}
		}

		tracing::debug!(
			sources = self.profile.len(),
			emitted = queries.len(),
			gated,
			variants = variant_index,
			hard_limit = self.hard_limit,
			"Completion request compiled."
		);

		Ok(CompiledSuggest { queries, profiles, offset: self.offset, hard_limit: self.hard_limit })
	}

	fn compile_source(
		&self,
		source: &SuggestSource,
		text: &str,
		query_len: usize,
	) -> Option<CompletionQuery> {
		if query_len < source.min_query_len {
			return None;
		}
		if let Some(max) = source.max_query_len
			&& query_len > max
		{
			return None;
		}

		let size = (f64::from(self.hard_limit) * source.fetch_limit_factor).ceil() as u32;

		Some(CompletionQuery {
			name: source.name.clone(),
			field: source.field.clone(),
			prefix: text.trim_ascii_start().to_string(),
			size,
			fuzzy: source.fuzzy.clone(),
		})
	}
}

pub fn compute_hard_limit(limit: u32, offset: u32, ceiling: u32) -> u32 {
	limit.saturating_add(offset).min(ceiling)
}

fn variant_source(source: &SuggestSource, index: u32) -> SuggestSource {
	SuggestSource {
		name: format!("{}-variant-{index}", source.name),
		discount: source.discount * (VARIANT_EXTRA_DISCOUNT / f64::from(index)),
		fallback: true,
		..source.clone()
	}
}

fn truncate_chars(text: &str, max: usize) -> &str {
	match text.char_indices().nth(max) {
		Some((end, _)) => &text[..end],
		None => text,
	}
}
