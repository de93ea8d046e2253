//! Highlight field definitions and their merge rules.

use serde_json::{Map, Value};

use crate::{
	Error, Result,
	dsl::{BoolQuery, Query},
};
use cirrus_config::Scoring;

pub const FVH_HIGHLIGHTER: &str = "fvh";

const WHOLE_VALUE_FRAGMENT_SIZE: u32 = 10_000;

#[derive(Clone, Debug, PartialEq)]
pub struct HighlightedField {
	pub field_name: String,
	pub highlighter_type: String,
	pub target: String,
	pub priority: u32,
	pub number_of_fragments: Option<u32>,
	pub fragmenter: Option<String>,
	pub fragment_size: Option<u32>,
	pub no_match_size: Option<u32>,
	pub matched_fields: Vec<String>,
	pub options: Map<String, Value>,
	pub highlight_query: Option<Query>,
	pub order: Option<String>,
}
impl HighlightedField {
	pub fn new(
		field_name: impl Into<String>,
		highlighter_type: impl Into<String>,
		target: impl Into<String>,
		priority: u32,
	) -> Self {
		Self {
			field_name: field_name.into(),
			highlighter_type: highlighter_type.into(),
			target: target.into(),
			priority,
			number_of_fragments: None,
			fragmenter: None,
			fragment_size: None,
			no_match_size: None,
			matched_fields: Vec::new(),
			options: Map::new(),
			highlight_query: None,
			order: None,
		}
	}

	/// Builds the field definition used for a full-text search on `field_name`, if it has one.
	pub fn for_search_text(
		field_name: &str,
		target: &str,
		priority: u32,
		scoring: &Scoring,
	) -> Option<Self> {
		let field = match field_name {
			"title" => Self::entire_value(field_name, target, priority),
			"redirect.title" | "category" | "heading" =>
				Self::redirect_and_headings(field_name, target, priority),
			"text" | "source_text.plain" => Self::main_text(field_name, target, priority, scoring),
			"auxiliary_text" | "file_text" => Self::text(field_name, target, priority, scoring),
			_ => return None,
		};

		Some(field)
	}

	pub fn with_highlight_query(mut self, query: Query) -> Self {
		self.highlight_query = Some(query);

		self
	}

	pub fn with_option(mut self, name: &str, value: impl Into<Value>) -> Self {
		self.options.insert(name.to_string(), value.into());

		self
	}

	fn entire_value(field_name: &str, target: &str, priority: u32) -> Self {
		let mut field = Self::new(field_name, FVH_HIGHLIGHTER, target, priority);

		field.number_of_fragments = Some(0);
		field.order = Some("score".to_string());
		field.match_plain_fields();

		field
	}

	fn redirect_and_headings(field_name: &str, target: &str, priority: u32) -> Self {
		let mut field = Self::new(field_name, FVH_HIGHLIGHTER, target, priority);

		field.number_of_fragments = Some(1);
		field.fragment_size = Some(WHOLE_VALUE_FRAGMENT_SIZE);
		field.order = Some("score".to_string());
		field.match_plain_fields();

		field
	}

	fn text(field_name: &str, target: &str, priority: u32, scoring: &Scoring) -> Self {
		let mut field = Self::new(field_name, FVH_HIGHLIGHTER, target, priority);

		field.number_of_fragments = Some(1);
		field.fragment_size = Some(scoring.fragment_size);
		field.order = Some("score".to_string());
		field.match_plain_fields();

		field
	}

	fn main_text(field_name: &str, target: &str, priority: u32, scoring: &Scoring) -> Self {
		let mut field = Self::text(field_name, target, priority, scoring);

		field.no_match_size = Some(scoring.fragment_size);

		field
	}

	fn match_plain_fields(&mut self) {
		if !self.field_name.ends_with(".plain") {
			self.matched_fields = vec![self.field_name.clone(), format!("{}.plain", self.field_name)];
		}
	}

	fn mismatch(&self, message: &str) -> Error {
		Error::HighlightMerge { field: self.field_name.clone(), message: message.to_string() }
	}

	/// Combines two definitions of the same field into one whose query matches either side.
	pub fn merge(&self, other: &Self) -> Result<Self> {
		if self.field_name != other.field_name {
			return Err(self.mismatch(&format!(
				"field names differ, cannot merge with [{}].",
				other.field_name
			)));
		}
		if self.highlighter_type != other.highlighter_type {
			return Err(self.mismatch("highlighter types differ."));
		}
		if self.target != other.target {
			return Err(self.mismatch("targets differ."));
		}

		let (Some(left), Some(right)) = (&self.highlight_query, &other.highlight_query) else {
			return Err(self.mismatch("both sides need a highlight query."));
		};

		if self.matched_fields != other.matched_fields {
			return Err(self.mismatch("matched fields differ."));
		}
		if self.fragmenter != other.fragmenter {
			return Err(self.mismatch("fragmenters differ."));
		}
		if self.number_of_fragments != other.number_of_fragments {
			return Err(self.mismatch("number of fragments differ."));
		}
		if self.no_match_size != other.no_match_size {
			return Err(self.mismatch("no match sizes differ."));
		}
		if self.options != other.options {
			return Err(self.mismatch("options differ."));
		}

		let merged = match left {
			Query::Bool(existing) => {
				let mut existing = existing.clone();

				existing.should.push(right.clone());

				existing
			},
			_ => BoolQuery { should: vec![left.clone(), right.clone()], ..BoolQuery::default() },
		};

		Ok(Self { highlight_query: Some(Query::Bool(merged)), ..self.clone() })
	}

	pub fn to_value(&self) -> Value {
		let mut output = Map::new();

		output.insert("type".to_string(), Value::String(self.highlighter_type.clone()));

		if let Some(count) = self.number_of_fragments {
			output.insert("number_of_fragments".to_string(), Value::from(count));
		}
		if let Some(fragmenter) = &self.fragmenter {
			output.insert("fragmenter".to_string(), Value::String(fragmenter.clone()));
		}
		if let Some(query) = &self.highlight_query {
			output.insert("highlight_query".to_string(), query.to_value());
		}
		if let Some(order) = &self.order {
			output.insert("order".to_string(), Value::String(order.clone()));
		}
		if let Some(size) = self.fragment_size {
			output.insert("fragment_size".to_string(), Value::from(size));
		}
		if let Some(size) = self.no_match_size.filter(|size| *size > 0) {
			output.insert("no_match_size".to_string(), Value::from(size));
		}
		if !self.options.is_empty() {
			output.insert("options".to_string(), Value::Object(self.options.clone()));
		}
		if !self.matched_fields.is_empty() {
			output.insert(
				"matched_fields".to_string(),
				Value::Array(self.matched_fields.iter().cloned().map(Value::String).collect()),
			);
		}

		Value::Object(output)
	}
}

/// Renders the `highlight.fields` object, keyed by field name.
pub fn highlight_fields(fields: &[HighlightedField]) -> Value {
	let mut output = Map::new();

	for field in fields {
		output.insert(field.field_name.clone(), field.to_value());
	}

	serde_json::json!({ "fields": output })
}
