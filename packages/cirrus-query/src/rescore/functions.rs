use std::f64::consts::LN_2;

use serde_json::{Map, Value};

use crate::{
	Error, Result,
	dsl::{FieldValueFactor, FunctionScore, Query, Script},
	rescore::{
		SearchContext,
		boosted::{BoostTemplates, TermBoost},
		scripts::{GeoMean, LogMultiply, LogScaleBoost, Saturation},
	},
	time_serde,
};
use cirrus_config::{Factor, FunctionSpec, PreferRecentDefaults, Scoring};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// The closed set of built-in rescore function types.
#[derive(Clone, Debug)]
pub enum FunctionKind {
	IncomingLinks { weight: Factor },
	PreferRecent { weight: Factor, defaults: PreferRecentDefaults },
	BoostTemplates(BoostTemplates),
	Namespaces(NamespaceBoost),
	Language(LanguageBoost),
	CustomField(CustomField),
	Script { weight: Factor, source: String },
	LogScaleBoost(LogScaleBoost),
	Saturation(Saturation),
	LogMultiply(LogMultiply),
	GeoMean(GeoMean),
	TermBoost(TermBoost),
}
impl FunctionKind {
	/// Resolves a configured function; `Ok(None)` when the type is not built in.
	pub fn parse(spec: &FunctionSpec, scoring: &Scoring) -> Result<Option<Self>> {
		let weight = spec.weight.clone().unwrap_or(Factor::Value(1.0));
		let params = || Params::new(&spec.kind, &spec.params);
		let kind = match spec.kind.as_str() {
			"boostlinks" => Self::IncomingLinks { weight },
			"recency" => Self::PreferRecent { weight, defaults: scoring.prefer_recent.clone() },
			"templates" => Self::BoostTemplates(BoostTemplates::new(weight, scoring)),
			"namespaces" => Self::Namespaces(NamespaceBoost::new(weight, scoring)),
			"language" => Self::Language(LanguageBoost::new(weight, scoring)),
			"custom_field" => Self::CustomField(CustomField::parse(weight, &params()?)?),
			"script" => {
				let source = spec
					.script
					.clone()
					.or(params()?.string("script")?)
					.filter(|source| !source.trim().is_empty())
					.ok_or_else(|| Error::invalid_profile("script: script is mandatory."))?;

				Self::Script { weight, source }
			},
			"logscale_boost" => Self::LogScaleBoost(LogScaleBoost::parse(weight, &params()?)?),
			"satu" => Self::Saturation(Saturation::parse(weight, &params()?)?),
			"log_multi" => Self::LogMultiply(LogMultiply::parse(weight, &params()?)?),
			"geomean" => Self::GeoMean(GeoMean::parse(weight, &params()?)?),
			"term_boost" => Self::TermBoost(TermBoost::parse(weight, &spec.params)?),
			_ => return Ok(None),
		};

		Ok(Some(kind))
	}

	pub fn append(&self, ctx: &SearchContext, function_score: &mut FunctionScore) -> Result<()> {
		match self {
			Self::IncomingLinks { weight } => {
				let mut params = FieldValueFactor::new("incoming_links");

				params.modifier = Some("log2p".to_string());
				params.missing = Some(0.0);

				function_score.add_field_value_factor_function(
					params,
					None,
					ctx.resolve_factor(weight),
				);
			},
			Self::PreferRecent { weight, defaults } =>
				append_prefer_recent(ctx, defaults, ctx.resolve_factor(weight), function_score),
			Self::BoostTemplates(function) => function.append(ctx, function_score),
			Self::Namespaces(function) => function.append(ctx, function_score),
			Self::Language(function) => function.append(ctx, function_score),
			Self::CustomField(function) => function.append(ctx, function_score),
			Self::Script { weight, source } => function_score.add_script_score_function(
				Script::expression(source.clone()),
				None,
				ctx.resolve_factor(weight),
			),
			Self::LogScaleBoost(function) => function.append(ctx, function_score)?,
			Self::Saturation(function) => function.append(ctx, function_score)?,
			Self::LogMultiply(function) => function.append(ctx, function_score)?,
			Self::GeoMean(function) => function.append(ctx, function_score)?,
			Self::TermBoost(function) => function.append(ctx, function_score),
		}

		Ok(())
	}
}

fn append_prefer_recent(
	ctx: &SearchContext,
	defaults: &PreferRecentDefaults,
	weight: f64,
	function_score: &mut FunctionScore,
) {
	let Some(options) = ctx.prefer_recent else {
		return;
	};
	let decay_portion = options.decay_portion.unwrap_or(defaults.decay_portion).clamp(0.0, 1.0);
	let half_life_days = options.half_life_days.unwrap_or(defaults.half_life_days);

	if !(decay_portion > 0.0 && half_life_days > 0.0 && half_life_days.is_finite()) {
		return;
	}

	let decay_constant = LN_2 / half_life_days / MILLIS_PER_DAY;
	let mut source = "exp(decayConstant * (doc['timestamp'].value - now))".to_string();
	let mut script = Script::expression("")
		.with_param("decayConstant", decay_constant)
		.with_param("now", time_serde::epoch_millis(ctx.now));

	if decay_portion != 1.0 {
		source.push_str(" * decayPortion + nonDecayPortion");

		script = script
			.with_param("decayPortion", decay_portion)
			.with_param("nonDecayPortion", 1.0 - decay_portion);
	}

	script.source = source;

	function_score.add_script_score_function(script, None, weight);
}

#[derive(Clone, Debug)]
pub struct NamespaceBoost {
	weight: Factor,
	configured: Vec<(i32, f64)>,
	searchable: Vec<i32>,
	default_weight: f64,
	talk_weight: f64,
}
impl NamespaceBoost {
	const MAIN: i32 = 0;
	const MAIN_TALK: i32 = 1;

	fn new(weight: Factor, scoring: &Scoring) -> Self {
		Self {
			weight,
			configured: scoring
				.namespace_weights
				.iter()
				.map(|entry| (entry.namespace, entry.weight))
				.collect(),
			searchable: scoring.searchable_namespaces.clone(),
			default_weight: scoring.default_namespace_weight,
			talk_weight: scoring.talk_namespace_weight,
		}
	}

	fn configured(&self, namespace: i32) -> Option<f64> {
		self.configured.iter().find(|(candidate, _)| *candidate == namespace).map(|(_, weight)| *weight)
	}

	pub fn namespace_weight(&self, namespace: i32) -> f64 {
		if let Some(weight) = self.configured(namespace) {
			return weight;
		}
		// Negative and even namespaces are subject namespaces.
		if namespace < 0 || namespace % 2 == 0 {
			return if namespace == Self::MAIN { 1.0 } else { self.default_weight };
		}
		if let Some(subject) = self.configured(namespace - 1) {
			return subject * self.talk_weight;
		}
		if namespace == Self::MAIN_TALK {
			return self.talk_weight;
		}

		self.default_weight * self.talk_weight
	}

	fn append(&self, ctx: &SearchContext, function_score: &mut FunctionScore) {
		let namespaces = ctx.namespaces.as_deref().unwrap_or(self.searchable.as_slice());

		if namespaces.len() < 2 {
			return;
		}

		let mut groups: Vec<(f64, Vec<i32>)> = Vec::new();

		for &namespace in namespaces {
			let weight = self.namespace_weight(namespace);

			match groups.iter_mut().find(|(candidate, _)| *candidate == weight) {
				Some((_, members)) =>
					if !members.contains(&namespace) {
						members.push(namespace);
					},
				None => groups.push((weight, vec![namespace])),
			}
		}

		if groups.len() < 2 {
			return;
		}

		let function_weight = ctx.resolve_factor(&self.weight);

		for (weight, members) in groups {
			if weight == 1.0 {
				continue;
			}

			function_score.add_weight_function(weight * function_weight, Query::terms("namespace", members));
		}
	}
}

#[derive(Clone, Debug)]
pub struct LanguageBoost {
	weight: Factor,
	wiki_language: String,
	user_weight: f64,
	wiki_weight: f64,
}
impl LanguageBoost {
	fn new(weight: Factor, scoring: &Scoring) -> Self {
		Self {
			weight,
			wiki_language: scoring.wiki_language.clone(),
			user_weight: scoring.language_weight.user,
			wiki_weight: scoring.language_weight.wiki,
		}
	}

	fn append(&self, ctx: &SearchContext, function_score: &mut FunctionScore) {
		let function_weight = ctx.resolve_factor(&self.weight);
		let user_language = ctx
			.user_language
			.as_deref()
			.map(str::trim)
			.filter(|language| !language.is_empty())
			.unwrap_or(self.wiki_language.as_str());

		if self.user_weight != 0.0 {
			function_score.add_weight_function(
				self.user_weight * function_weight,
				Query::term("language", user_language),
			);
		}
		if self.wiki_weight != 0.0 && user_language != self.wiki_language {
			function_score.add_weight_function(
				self.wiki_weight * function_weight,
				Query::term("language", self.wiki_language.as_str()),
			);
		}
	}
}

#[derive(Clone, Debug)]
pub struct CustomField {
	weight: Factor,
	field: String,
	factor: Option<Factor>,
	modifier: Option<String>,
	missing: Option<f64>,
}
impl CustomField {
	fn parse(weight: Factor, params: &Params<'_>) -> Result<Self> {
		Ok(Self {
			weight,
			field: params.required_string("field")?,
			factor: params.factor("factor")?,
			modifier: params.string("modifier")?,
			missing: params.number("missing")?,
		})
	}

	fn append(&self, ctx: &SearchContext, function_score: &mut FunctionScore) {
		let factor = self.factor.as_ref().map(|factor| ctx.resolve_factor(factor));

		if factor == Some(0.0) {
			return;
		}

		let params = FieldValueFactor {
			field: self.field.clone(),
			factor,
			modifier: self.modifier.clone(),
			missing: self.missing,
		};

		function_score.add_field_value_factor_function(params, None, ctx.resolve_factor(&self.weight));
	}
}

/// Typed access to a function's `params` table with messages naming the function type.
pub(crate) struct Params<'a> {
	kind: &'a str,
	map: Option<&'a Map<String, Value>>,
}
impl<'a> Params<'a> {
	pub(crate) fn new(kind: &'a str, raw: &'a Value) -> Result<Self> {
		match raw {
			Value::Null => Ok(Self { kind, map: None }),
			Value::Object(map) => Ok(Self { kind, map: Some(map) }),
			_ => Err(Error::invalid_profile(format!("{kind}: params must be a table."))),
		}
	}

	pub(crate) fn get(&self, key: &str) -> Option<&'a Value> {
		self.map.and_then(|map| map.get(key))
	}

	pub(crate) fn invalid(&self, message: impl std::fmt::Display) -> Error {
		Error::invalid_profile(format!("{}: {message}", self.kind))
	}

	pub(crate) fn factor(&self, key: &str) -> Result<Option<Factor>> {
		self.get(key)
			.map(|raw| {
				serde_json::from_value::<Factor>(raw.clone()).map_err(|_| {
					self.invalid(format!(
						"{key} must be a number or a table with value and uri_param_override."
					))
				})
			})
			.transpose()
	}

	pub(crate) fn required_factor(&self, key: &str) -> Result<Factor> {
		self.factor(key)?.ok_or_else(|| self.invalid(format!("{key} is mandatory.")))
	}

	pub(crate) fn number(&self, key: &str) -> Result<Option<f64>> {
		match self.get(key) {
			None => Ok(None),
			Some(raw) => raw
				.as_f64()
				.filter(|value| value.is_finite())
				.map(Some)
				.ok_or_else(|| self.invalid(format!("{key} must be a number."))),
		}
	}

	pub(crate) fn string(&self, key: &str) -> Result<Option<String>> {
		match self.get(key) {
			None => Ok(None),
			Some(Value::String(raw)) => Ok(Some(raw.clone())),
			Some(_) => Err(self.invalid(format!("{key} must be a string."))),
		}
	}

	pub(crate) fn required_string(&self, key: &str) -> Result<String> {
		self.string(key)?
			.filter(|raw| !raw.trim().is_empty())
			.ok_or_else(|| self.invalid(format!("{key} is mandatory.")))
	}
}
