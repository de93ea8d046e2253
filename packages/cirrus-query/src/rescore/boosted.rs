use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
	Error, Result,
	dsl::{BoolQuery, FunctionScore, Query},
	rescore::SearchContext,
};
use cirrus_config::{ExtraIndex, Factor, Scoring};

/// Filter queries with their weights; each pair becomes one weight function.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoostedQueriesFunction {
	queries: Vec<Query>,
	weights: Vec<f64>,
}
impl BoostedQueriesFunction {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, query: Query, weight: f64) {
		self.queries.push(query);
		self.weights.push(weight);
	}

	pub fn len(&self) -> usize {
		self.queries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.queries.is_empty()
	}

	pub fn append(&self, function_score: &mut FunctionScore) {
		for (query, weight) in self.queries.iter().zip(&self.weights) {
			function_score.add_weight_function(*weight, query.clone());
		}
	}
}

#[derive(Clone, Debug)]
pub struct BoostTemplates {
	weight: Factor,
	defaults: BTreeMap<String, f64>,
	extra_indexes: Vec<ExtraIndex>,
}
impl BoostTemplates {
	pub(crate) fn new(weight: Factor, scoring: &Scoring) -> Self {
		Self {
			weight,
			defaults: scoring.boost_templates.clone(),
			extra_indexes: scoring.extra_indexes.clone(),
		}
	}

	pub fn boosted_queries(&self, ctx: &SearchContext) -> BoostedQueriesFunction {
		let weight = ctx.resolve_factor(&self.weight);
		let mut boosted = BoostedQueriesFunction::new();

		if ctx.with_default_boosts {
			for (template, template_weight) in &self.defaults {
				boosted.push(Query::match_text("template", template.as_str()), template_weight * weight);
			}
		}

		if ctx.local_search {
			return boosted;
		}

		let Some(namespaces) = ctx.namespaces.as_deref().filter(|namespaces| !namespaces.is_empty())
		else {
			return boosted;
		};
		// One boost set per wiki; a later index for the same wiki replaces an earlier one.
		let mut per_wiki: Vec<(&str, &BTreeMap<String, f64>)> = Vec::new();

		for index in &self.extra_indexes {
			if index.boost_templates.is_empty()
				|| !index.namespaces.iter().any(|namespace| namespaces.contains(namespace))
			{
				continue;
			}

			match per_wiki.iter_mut().find(|(wiki, _)| *wiki == index.wiki) {
				Some(entry) => entry.1 = &index.boost_templates,
				None => per_wiki.push((index.wiki.as_str(), &index.boost_templates)),
			}
		}

		for (wiki, templates) in per_wiki {
			for (template, template_weight) in templates {
				let filter = BoolQuery::must(vec![
					Query::match_text("wiki", wiki),
					Query::match_text("template", template.as_str()),
				]);

				boosted.push(filter.into(), template_weight * weight);
			}
		}

		boosted
	}

	pub(crate) fn append(&self, ctx: &SearchContext, function_score: &mut FunctionScore) {
		self.boosted_queries(ctx).append(function_score);
	}
}

/// `term` filters on arbitrary fields, configured as `{field: {term: boost}}`.
#[derive(Clone, Debug)]
pub struct TermBoost {
	weight: Factor,
	terms: Vec<(String, String, f64)>,
}
impl TermBoost {
	pub(crate) fn parse(weight: Factor, params: &Value) -> Result<Self> {
		let invalid = |message: String| Error::invalid_profile(format!("term_boost: {message}"));
		let fields = params
			.as_object()
			.ok_or_else(|| invalid("params must be a table of fields.".to_string()))?;
		let mut terms = Vec::new();

		for (field, boosts) in fields {
			let boosts = boosts
				.as_object()
				.ok_or_else(|| invalid(format!("{field} must be a table of term boosts.")))?;

			for (term, boost) in boosts {
				let boost = boost
					.as_f64()
					.filter(|boost| boost.is_finite())
					.ok_or_else(|| invalid(format!("{field}.{term} must be a number.")))?;

				terms.push((field.clone(), term.clone(), boost));
			}
		}

		Ok(Self { weight, terms })
	}

	pub(crate) fn append(&self, ctx: &SearchContext, function_score: &mut FunctionScore) {
		let weight = ctx.resolve_factor(&self.weight);
		let mut boosted = BoostedQueriesFunction::new();

		for (field, term, boost) in &self.terms {
			boosted.push(Query::term(field.as_str(), term.as_str()), boost * weight);
		}

		boosted.append(function_score);
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use crate::{
		dsl::{FunctionScore, Query},
		rescore::{
			SearchContext,
			boosted::{BoostTemplates, BoostedQueriesFunction, TermBoost},
		},
	};
	use cirrus_config::{ExtraIndex, Factor, Scoring};

	fn scoring() -> Scoring {
		Scoring {
			boost_templates: BTreeMap::from([("Template:Featured".to_string(), 2.0)]),
			extra_indexes: vec![ExtraIndex {
				index: "commonswiki_file".to_string(),
				wiki: "commonswiki".to_string(),
				namespaces: vec![6],
				boost_templates: BTreeMap::from([("Template:Quality".to_string(), 1.5)]),
			}],
			..Scoring::default()
		}
	}

	#[test]
	fn queries_and_weights_grow_together() {
		let mut boosted = BoostedQueriesFunction::new();

		boosted.push(Query::term("a", "b"), 1.0);
		boosted.push(Query::term("c", "d"), 2.0);

		let mut function_score = FunctionScore::default();

		boosted.append(&mut function_score);

		assert_eq!(boosted.len(), 2);
		assert_eq!(function_score.len(), 2);
		assert_eq!(function_score.functions[1].weight(), 2.0);
	}

	#[test]
	fn default_templates_are_weighted_by_function_weight() {
		let templates = BoostTemplates::new(Factor::Value(2.0), &scoring());
		let boosted = templates.boosted_queries(&SearchContext::default());
		let mut function_score = FunctionScore::default();

		boosted.append(&mut function_score);

		assert_eq!(
			function_score.functions[0].to_value(),
			serde_json::json!({
				"filter": { "match": { "template": { "query": "Template:Featured" } } },
				"weight": 4.0
			})
		);
	}

	#[test]
	fn extra_index_boosts_need_requested_namespaces() {
		let templates = BoostTemplates::new(Factor::Value(1.0), &scoring());
		let mut ctx = SearchContext::default();

		assert_eq!(templates.boosted_queries(&ctx).len(), 1);

		ctx.namespaces = Some(vec![0, 6]);

		let boosted = templates.boosted_queries(&ctx);
		let mut function_score = FunctionScore::default();

		boosted.append(&mut function_score);

		assert_eq!(function_score.len(), 2);
		assert_eq!(
			function_score.functions[1].to_value()["filter"],
			serde_json::json!({ "bool": { "must": [
				{ "match": { "wiki": { "query": "commonswiki" } } },
				{ "match": { "template": { "query": "Template:Quality" } } }
			] } })
		);

		ctx.local_search = true;

		assert_eq!(templates.boosted_queries(&ctx).len(), 1);
	}

	#[test]
	fn disabling_default_boosts_keeps_extra_index_boosts() {
		let templates = BoostTemplates::new(Factor::Value(1.0), &scoring());
		let mut ctx = SearchContext::default();

		ctx.with_default_boosts = false;
		ctx.namespaces = Some(vec![6]);

		assert_eq!(templates.boosted_queries(&ctx).len(), 1);
	}

	#[test]
	fn term_boost_rejects_non_numeric_boosts() {
		let params = serde_json::json!({ "labels.en": { "featured": "high" } });

		assert!(TermBoost::parse(Factor::Value(1.0), &params).is_err());
	}
}
