//! Minimal Elasticsearch query DSL values rendered with [`serde_json`].

use serde_json::{Map, Value};

use cirrus_config::{BoostMode, RescoreChain, ScoreMode};

#[derive(Clone, Debug, PartialEq)]
pub enum Query {
	MatchAll,
	Match { field: String, query: Value },
	Term { field: String, value: Value },
	Terms { field: String, values: Vec<Value> },
	Bool(BoolQuery),
}
impl Query {
	pub fn match_text(field: impl Into<String>, query: impl Into<Value>) -> Self {
		Self::Match { field: field.into(), query: query.into() }
	}

	pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
		Self::Term { field: field.into(), value: value.into() }
	}

	pub fn terms<I, V>(field: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		Self::Terms { field: field.into(), values: values.into_iter().map(Into::into).collect() }
	}

	pub fn to_value(&self) -> Value {
		match self {
			Self::MatchAll => serde_json::json!({ "match_all": {} }),
			Self::Match { field, query } =>
				keyed("match", keyed(field, serde_json::json!({ "query": query }))),
			Self::Term { field, value } => keyed("term", keyed(field, value.clone())),
			Self::Terms { field, values } => keyed("terms", keyed(field, Value::Array(values.clone()))),
			Self::Bool(query) => query.to_value(),
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoolQuery {
	pub must: Vec<Query>,
	pub should: Vec<Query>,
	pub filter: Vec<Query>,
	pub must_not: Vec<Query>,
}
impl BoolQuery {
	pub fn must(queries: Vec<Query>) -> Self {
		Self { must: queries, ..Self::default() }
	}

	pub fn to_value(&self) -> Value {
		let mut clauses = Map::new();

		for (occur, queries) in [
			("must", &self.must),
			("should", &self.should),
			("filter", &self.filter),
			("must_not", &self.must_not),
		] {
			if !queries.is_empty() {
				clauses.insert(
					occur.to_string(),
					Value::Array(queries.iter().map(Query::to_value).collect()),
				);
			}
		}

		keyed("bool", Value::Object(clauses))
	}
}
impl From<BoolQuery> for Query {
	fn from(query: BoolQuery) -> Self {
		Self::Bool(query)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Script {
	pub source: String,
	pub lang: String,
	pub params: Map<String, Value>,
}
impl Script {
	/// Lucene expression script, the only language the scoring functions emit.
	pub fn expression(source: impl Into<String>) -> Self {
		Self { source: source.into(), lang: "expression".to_string(), params: Map::new() }
	}

	pub fn with_param(mut self, name: &str, value: impl Into<Value>) -> Self {
		self.params.insert(name.to_string(), value.into());

		self
	}

	pub fn to_value(&self) -> Value {
		let mut script = serde_json::json!({ "source": self.source, "lang": self.lang });

		if !self.params.is_empty()
			&& let Some(object) = script.as_object_mut()
		{
			object.insert("params".to_string(), Value::Object(self.params.clone()));
		}

		script
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldValueFactor {
	pub field: String,
	pub factor: Option<f64>,
	pub modifier: Option<String>,
	pub missing: Option<f64>,
}
impl FieldValueFactor {
	pub fn new(field: impl Into<String>) -> Self {
		Self { field: field.into(), factor: None, modifier: None, missing: None }
	}

	fn to_value(&self) -> Value {
		let mut params = Map::new();

		params.insert("field".to_string(), Value::String(self.field.clone()));

		if let Some(factor) = self.factor {
			params.insert("factor".to_string(), serde_json::json!(factor));
		}
		if let Some(modifier) = &self.modifier {
			params.insert("modifier".to_string(), Value::String(modifier.clone()));
		}
		if let Some(missing) = self.missing {
			params.insert("missing".to_string(), serde_json::json!(missing));
		}

		Value::Object(params)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScoreFunction {
	Weight { weight: f64, filter: Query },
	ScriptScore { script: Script, filter: Option<Query>, weight: f64 },
	FieldValueFactor { params: FieldValueFactor, filter: Option<Query>, weight: f64 },
}
impl ScoreFunction {
	pub fn weight(&self) -> f64 {
		match self {
			Self::Weight { weight, .. }
			| Self::ScriptScore { weight, .. }
			| Self::FieldValueFactor { weight, .. } => *weight,
		}
	}

	pub fn to_value(&self) -> Value {
		let (mut function, filter, weight) = match self {
			Self::Weight { weight, filter } => (Map::new(), Some(filter), *weight),
			Self::ScriptScore { script, filter, weight } => {
				let mut function = Map::new();

				function.insert(
					"script_score".to_string(),
					serde_json::json!({ "script": script.to_value() }),
				);

				(function, filter.as_ref(), *weight)
			},
			Self::FieldValueFactor { params, filter, weight } => {
				let mut function = Map::new();

				function.insert("field_value_factor".to_string(), params.to_value());

				(function, filter.as_ref(), *weight)
			},
		};

		if let Some(filter) = filter {
			function.insert("filter".to_string(), filter.to_value());
		}

		function.insert("weight".to_string(), serde_json::json!(weight));

		Value::Object(function)
	}
}

/// A `function_score` over `match_all`, the shape every rescore chain compiles to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionScore {
	pub functions: Vec<ScoreFunction>,
	pub boost: Option<f64>,
	pub boost_mode: Option<BoostMode>,
	pub max_boost: Option<f64>,
	pub score_mode: Option<ScoreMode>,
	pub min_score: Option<f64>,
}
impl FunctionScore {
	pub fn from_chain(chain: &RescoreChain) -> Self {
		Self {
			functions: Vec::new(),
			boost: chain.boost,
			boost_mode: chain.boost_mode,
			max_boost: chain.max_boost,
			score_mode: chain.score_mode,
			min_score: chain.min_score,
		}
	}

	pub fn len(&self) -> usize {
		self.functions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.functions.is_empty()
	}

	pub fn add_weight_function(&mut self, weight: f64, filter: Query) {
		self.functions.push(ScoreFunction::Weight { weight, filter });
	}

	pub fn add_script_score_function(&mut self, script: Script, filter: Option<Query>, weight: f64) {
		self.functions.push(ScoreFunction::ScriptScore { script, filter, weight });
	}

	pub fn add_field_value_factor_function(
		&mut self,
		params: FieldValueFactor,
		filter: Option<Query>,
		weight: f64,
	) {
		self.functions.push(ScoreFunction::FieldValueFactor { params, filter, weight });
	}

	pub fn to_value(&self) -> Value {
		let mut body = Map::new();

		body.insert("query".to_string(), Query::MatchAll.to_value());
		body.insert(
			"functions".to_string(),
			Value::Array(self.functions.iter().map(ScoreFunction::to_value).collect()),
		);

		if let Some(boost) = self.boost {
			body.insert("boost".to_string(), serde_json::json!(boost));
		}
		if let Some(mode) = self.boost_mode {
			body.insert("boost_mode".to_string(), Value::String(mode.as_str().to_string()));
		}
		if let Some(max_boost) = self.max_boost {
			body.insert("max_boost".to_string(), serde_json::json!(max_boost));
		}
		if let Some(mode) = self.score_mode {
			body.insert("score_mode".to_string(), Value::String(mode.as_str().to_string()));
		}
		if let Some(min_score) = self.min_score {
			body.insert("min_score".to_string(), serde_json::json!(min_score));
		}

		keyed("function_score", Value::Object(body))
	}
}

pub(crate) fn keyed(key: &str, value: Value) -> Value {
	let mut object = Map::new();

	object.insert(key.to_string(), value);

	Value::Object(object)
}

#[cfg(test)]
mod tests {
	use crate::dsl::{BoolQuery, FieldValueFactor, FunctionScore, Query, Script};
	use cirrus_config::{BoostMode, RescoreChain};

	#[test]
	fn renders_leaf_queries() {
		assert_eq!(
			Query::match_text("template", "Template:Featured").to_value(),
			serde_json::json!({ "match": { "template": { "query": "Template:Featured" } } })
		);
		assert_eq!(
			Query::terms("namespace", [1, 3]).to_value(),
			serde_json::json!({ "terms": { "namespace": [1, 3] } })
		);
	}

	#[test]
	fn bool_query_omits_empty_clauses() {
		let query = BoolQuery::must(vec![Query::match_text("wiki", "commonswiki")]);

		assert_eq!(
			query.to_value(),
			serde_json::json!({ "bool": { "must": [{ "match": { "wiki": { "query": "commonswiki" } } }] } })
		);
	}

	#[test]
	fn function_score_carries_chain_parameters() {
		let chain = RescoreChain {
			boost_mode: Some(BoostMode::Multiply),
			max_boost: Some(4.0),
			..RescoreChain::default()
		};
		let mut function_score = FunctionScore::from_chain(&chain);

		function_score.add_script_score_function(Script::expression("1"), None, 2.0);
		function_score.add_field_value_factor_function(FieldValueFactor::new("incoming_links"), None, 1.0);

		let value = function_score.to_value();
		let body = &value["function_score"];

		assert_eq!(body["query"], serde_json::json!({ "match_all": {} }));
		assert_eq!(body["boost_mode"], "multiply");
		assert_eq!(body["max_boost"], 4.0);
		assert!(body.get("score_mode").is_none());
		assert_eq!(body["functions"][0]["script_score"]["script"]["lang"], "expression");
		assert_eq!(body["functions"][0]["weight"], 2.0);
		assert_eq!(body["functions"][1]["field_value_factor"]["field"], "incoming_links");
	}
}
