use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_HARD_LIMIT: u32 = 50;
pub const DEFAULT_MAX_INPUT_LENGTH: usize = 50;

/// Ordered list of suggestion sources; order drives sub-query order and decode tie-breaks.
pub type SuggestProfile = Vec<SuggestSource>;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub completion: Completion,
	#[serde(default)]
	pub scoring: Scoring,
	#[serde(default)]
	pub rescore: Rescore,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Completion {
	/// Ceiling applied to `limit + offset`; unset means 50.
	pub hard_limit: Option<u32>,
	#[serde(default = "default_max_input_length")]
	pub max_input_length: usize,
	/// Optional. Terms longer than this many codepoints are rejected instead of truncated.
	pub max_request_chars: Option<usize>,
	pub default_profile: String,
	pub profiles: HashMap<String, SuggestProfile>,
}
impl Completion {
	pub fn hard_limit_ceiling(&self) -> u32 {
		self.hard_limit.unwrap_or(DEFAULT_HARD_LIMIT)
	}

	pub fn profile(&self, name: &str) -> Option<&SuggestProfile> {
		self.profiles.get(name)
	}
}
impl Default for Completion {
	fn default() -> Self {
		Self {
			hard_limit: None,
			max_input_length: DEFAULT_MAX_INPUT_LENGTH,
			max_request_chars: None,
			default_profile: "default".to_string(),
			profiles: HashMap::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SuggestSource {
	pub name: String,
	pub field: String,
	#[serde(default)]
	pub min_query_len: usize,
	pub max_query_len: Option<usize>,
	#[serde(default = "default_fetch_limit_factor")]
	pub fetch_limit_factor: f64,
	#[serde(default = "default_discount")]
	pub discount: f64,
	#[serde(default)]
	pub fallback: bool,
	pub fuzzy: Option<Fuzzy>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Fuzzy {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fuzziness: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub transpositions: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub min_length: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub prefix_length: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub unicode_aware: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Scoring {
	pub wiki_language: String,
	pub language_weight: LanguageWeight,
	pub default_namespace_weight: f64,
	pub talk_namespace_weight: f64,
	pub namespace_weights: Vec<NamespaceWeight>,
	/// Namespaces considered by the namespace boost when a request names none.
	pub searchable_namespaces: Vec<i32>,
	pub boost_templates: BTreeMap<String, f64>,
	pub extra_indexes: Vec<ExtraIndex>,
	pub prefer_recent: PreferRecentDefaults,
	pub fragment_size: u32,
	pub filetype_aliases: BTreeMap<String, String>,
}
impl Default for Scoring {
	fn default() -> Self {
		Self {
			wiki_language: "en".to_string(),
			language_weight: LanguageWeight::default(),
			default_namespace_weight: 0.2,
			talk_namespace_weight: 0.25,
			namespace_weights: Vec::new(),
			searchable_namespaces: vec![0],
			boost_templates: BTreeMap::new(),
			extra_indexes: Vec::new(),
			prefer_recent: PreferRecentDefaults::default(),
			fragment_size: 150,
			filetype_aliases: BTreeMap::new(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LanguageWeight {
	pub user: f64,
	pub wiki: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamespaceWeight {
	pub namespace: i32,
	pub weight: f64,
}

/// A secondary index searched alongside the local one for some namespaces.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtraIndex {
	pub index: String,
	pub wiki: String,
	pub namespaces: Vec<i32>,
	#[serde(default)]
	pub boost_templates: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreferRecentDefaults {
	pub decay_portion: f64,
	pub half_life_days: f64,
}
impl Default for PreferRecentDefaults {
	fn default() -> Self {
		Self { decay_portion: 0.6, half_life_days: 160.0 }
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rescore {
	#[serde(default)]
	pub chains: HashMap<String, RescoreChain>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RescoreChain {
	pub functions: Option<Vec<FunctionSpec>>,
	#[serde(default)]
	pub add_extensions: bool,
	pub boost: Option<f64>,
	pub boost_mode: Option<BoostMode>,
	pub max_boost: Option<f64>,
	pub score_mode: Option<ScoreMode>,
	pub min_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FunctionSpec {
	#[serde(rename = "type")]
	pub kind: String,
	pub weight: Option<Factor>,
	#[serde(default)]
	pub params: Value,
	pub script: Option<String>,
}
impl FunctionSpec {
	pub fn new(kind: impl Into<String>) -> Self {
		Self { kind: kind.into(), weight: None, params: Value::Null, script: None }
	}
}

/// A numeric profile parameter, optionally replaced per request by a named override.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Factor {
	Value(f64),
	Overridable { value: f64, uri_param_override: Option<String> },
}
impl Factor {
	pub fn value(&self) -> f64 {
		match self {
			Self::Value(value) => *value,
			Self::Overridable { value, .. } => *value,
		}
	}

	pub fn override_key(&self) -> Option<&str> {
		match self {
			Self::Value(_) => None,
			Self::Overridable { uri_param_override, .. } => uri_param_override.as_deref(),
		}
	}
}
impl From<f64> for Factor {
	fn from(value: f64) -> Self {
		Self::Value(value)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoostMode {
	Multiply,
	Replace,
	Sum,
	Avg,
	Max,
	Min,
}
impl BoostMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Multiply => "multiply",
			Self::Replace => "replace",
			Self::Sum => "sum",
			Self::Avg => "avg",
			Self::Max => "max",
			Self::Min => "min",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
	Multiply,
	Sum,
	Avg,
	First,
	Max,
	Min,
}
impl ScoreMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Multiply => "multiply",
			Self::Sum => "sum",
			Self::Avg => "avg",
			Self::First => "first",
			Self::Max => "max",
			Self::Min => "min",
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_max_input_length() -> usize {
	DEFAULT_MAX_INPUT_LENGTH
}

fn default_fetch_limit_factor() -> f64 {
	1.0
}

fn default_discount() -> f64 {
	1.0
}
