use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::suggest::{CompiledSuggest, Suggestion};

/// Write-only record of one completion round trip.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompletionRequestLog {
	pub request_id: Uuid,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	pub term: Option<String>,
	pub request_fingerprint: Option<String>,
	pub index_name: Option<String>,
	pub response: Option<Value>,
	pub hits_total: usize,
	pub results: Vec<LoggedSuggestion>,
}
impl CompletionRequestLog {
	pub fn new() -> Self {
		Self {
			request_id: Uuid::new_v4(),
			created_at: OffsetDateTime::now_utc(),
			term: None,
			request_fingerprint: None,
			index_name: None,
			response: None,
			hits_total: 0,
			results: Vec::new(),
		}
	}

	pub fn for_request(term: &str, compiled: &CompiledSuggest) -> Self {
		Self {
			term: Some(term.to_string()),
			request_fingerprint: Some(compiled.fingerprint()),
			..Self::new()
		}
	}

	pub fn set_response(&mut self, response: Value) {
		self.response = Some(response);
	}

	pub fn set_result(&mut self, index_name: &str, hits_total: usize, suggestions: &[Suggestion]) {
		self.index_name = Some(index_name.to_string());
		self.hits_total = hits_total;
		self.results = suggestions
			.iter()
			.enumerate()
			.map(|(rank, suggestion)| LoggedSuggestion {
				page_id: suggestion.page_id,
				profile: suggestion.profile.clone(),
				score: suggestion.score,
				rank,
			})
			.collect();
	}
}
impl Default for CompletionRequestLog {
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggedSuggestion {
	pub page_id: u64,
	pub profile: String,
	pub score: f64,
	/// Zero-based position in the returned page.
	pub rank: usize,
}
