//! Scoring functions rendered as Lucene expression scripts over numeric document fields.

use serde_json::Value;

use crate::{
	Error, Result,
	dsl::{FunctionScore, Script},
	rescore::{SearchContext, functions::Params},
};
use cirrus_config::{Factor, FunctionSpec};

const DEFAULT_GEOMEAN_EPSILON: f64 = 1e-7;

fn invalid(kind: &str, message: impl std::fmt::Display) -> Error {
	Error::invalid_profile(format!("{kind}: {message}"))
}

fn field_value(field: &str) -> String {
	format!("doc['{field}'].value")
}

fn append_script(
	source: String,
	weight: &Factor,
	ctx: &SearchContext,
	function_score: &mut FunctionScore,
) {
	function_score.add_script_score_function(Script::expression(source), None, ctx.resolve_factor(weight));
}

/// Log-scaled field value normalized against `scale`, reaching half impact at `midpoint`.
#[derive(Clone, Debug)]
pub struct LogScaleBoost {
	weight: Factor,
	field: String,
	impact: Factor,
	scale: Factor,
	midpoint: Factor,
}
impl LogScaleBoost {
	const KIND: &'static str = "logscale_boost";

	pub(crate) fn parse(weight: Factor, params: &Params<'_>) -> Result<Self> {
		let boost = Self {
			weight,
			field: params.required_string("field")?,
			impact: params.required_factor("impact")?,
			scale: params.required_factor("scale")?,
			midpoint: params.required_factor("midpoint")?,
		};

		boost.script(&SearchContext::default())?;

		Ok(boost)
	}

	pub fn script(&self, ctx: &SearchContext) -> Result<String> {
		let impact = ctx.resolve_factor(&self.impact);
		let scale = ctx.resolve_factor(&self.scale);
		let midpoint = ctx.resolve_factor(&self.midpoint);

		if impact < 0.0 {
			return Err(invalid(Self::KIND, "impact must be zero or greater."));
		}
		if scale <= 0.0 {
			return Err(invalid(Self::KIND, "scale must be greater than zero."));
		}
		if midpoint <= 0.0 {
			return Err(invalid(Self::KIND, "midpoint must be greater than zero."));
		}
		if midpoint >= scale {
			return Err(invalid(Self::KIND, "midpoint must be lower than scale."));
		}

		let exponent = 0.5_f64.ln() / ((midpoint + 2.0).log10() / (scale + 2.0).log10()).ln();
		let value = field_value(&self.field);

		Ok(format!(
			"(1 - {impact}) + {impact} * pow(min(1, max(0, log10({value} + 2) / log10({scale} + 2))), {exponent})"
		))
	}

	pub(crate) fn append(&self, ctx: &SearchContext, function_score: &mut FunctionScore) -> Result<()> {
		append_script(self.script(ctx)?, &self.weight, ctx, function_score);

		Ok(())
	}
}

/// Saturation `x^a / (x^a + k^a)`, approaching 1 as the field value grows past `k`.
#[derive(Clone, Debug)]
pub struct Saturation {
	weight: Factor,
	field: String,
	k: Factor,
	a: Factor,
}
impl Saturation {
	const KIND: &'static str = "satu";

	pub(crate) fn parse(weight: Factor, params: &Params<'_>) -> Result<Self> {
		let satu = Self {
			weight,
			field: params.required_string("field")?,
			k: params.required_factor("k")?,
			a: params.factor("a")?.unwrap_or(Factor::Value(1.0)),
		};

		satu.script(&SearchContext::default())?;

		Ok(satu)
	}

	pub fn script(&self, ctx: &SearchContext) -> Result<String> {
		let k = ctx.resolve_factor(&self.k);
		let a = ctx.resolve_factor(&self.a);

		if k <= 0.0 {
			return Err(invalid(Self::KIND, "k must be greater than zero."));
		}
		if a <= 0.0 {
			return Err(invalid(Self::KIND, "a must be greater than zero."));
		}

		let value = field_value(&self.field);

		Ok(format!("pow({value}, {a}) / (pow({value}, {a}) + pow({k}, {a}))"))
	}

	pub(crate) fn append(&self, ctx: &SearchContext, function_score: &mut FunctionScore) -> Result<()> {
		append_script(self.script(ctx)?, &self.weight, ctx, function_score);

		Ok(())
	}
}

#[derive(Clone, Debug)]
pub struct LogMultiply {
	weight: Factor,
	field: String,
	impact: Factor,
}
impl LogMultiply {
	const KIND: &'static str = "log_multi";

	pub(crate) fn parse(weight: Factor, params: &Params<'_>) -> Result<Self> {
		let function = Self {
			weight,
			field: params.required_string("field")?,
			impact: params.required_factor("impact")?,
		};

		function.script(&SearchContext::default())?;

		Ok(function)
	}

	pub fn script(&self, ctx: &SearchContext) -> Result<String> {
		let impact = ctx.resolve_factor(&self.impact);

		if impact <= 0.0 {
			return Err(invalid(Self::KIND, "impact must be greater than zero."));
		}

		Ok(format!("pow(log10({} + 2), {impact})", field_value(&self.field)))
	}

	pub(crate) fn append(&self, ctx: &SearchContext, function_score: &mut FunctionScore) -> Result<()> {
		append_script(self.script(ctx)?, &self.weight, ctx, function_score);

		Ok(())
	}
}

#[derive(Clone, Debug)]
enum GeoMeanMember {
	Saturation(Saturation),
	LogScaleBoost(LogScaleBoost),
}
impl GeoMeanMember {
	fn script(&self, ctx: &SearchContext) -> Result<String> {
		match self {
			Self::Saturation(member) => member.script(ctx),
			Self::LogScaleBoost(member) => member.script(ctx),
		}
	}
}

/// Weighted geometric mean of several normalized scripts.
#[derive(Clone, Debug)]
pub struct GeoMean {
	weight: Factor,
	impact: Factor,
	epsilon: f64,
	members: Vec<(Factor, GeoMeanMember)>,
}
impl GeoMean {
	const KIND: &'static str = "geomean";

	pub(crate) fn parse(weight: Factor, params: &Params<'_>) -> Result<Self> {
		let raw_members = match params.get("members") {
			Some(Value::Array(members)) => members,
			_ => return Err(invalid(Self::KIND, "members must be a list of functions.")),
		};
		let mut members = Vec::with_capacity(raw_members.len());

		for raw in raw_members {
			let spec: FunctionSpec = serde_json::from_value(raw.clone())
				.map_err(|err| invalid(Self::KIND, format!("invalid member: {err}.")))?;
			let member_params = Params::new(&spec.kind, &spec.params)?;
			let member = match spec.kind.as_str() {
				"satu" => GeoMeanMember::Saturation(Saturation::parse(Factor::Value(1.0), &member_params)?),
				"logscale_boost" => GeoMeanMember::LogScaleBoost(LogScaleBoost::parse(
					Factor::Value(1.0),
					&member_params,
				)?),
				other =>
					return Err(invalid(
						Self::KIND,
						format!("unsupported member type {other}, expected satu or logscale_boost."),
					)),
			};

			members.push((spec.weight.unwrap_or(Factor::Value(1.0)), member));
		}

		if members.len() < 2 {
			return Err(invalid(Self::KIND, "at least two members are required."));
		}

		let geomean = Self {
			weight,
			impact: params.required_factor("impact")?,
			epsilon: params.number("epsilon")?.unwrap_or(DEFAULT_GEOMEAN_EPSILON),
			members,
		};

		if geomean.epsilon <= 0.0 {
			return Err(invalid(Self::KIND, "epsilon must be greater than zero."));
		}

		geomean.script(&SearchContext::default())?;

		Ok(geomean)
	}

	pub fn script(&self, ctx: &SearchContext) -> Result<String> {
		let impact = ctx.resolve_factor(&self.impact);

		if impact <= 0.0 || impact > 1.0 {
			return Err(invalid(Self::KIND, "impact must be in the range (0.0, 1.0]."));
		}

		let epsilon = self.epsilon;
		let mut factors = Vec::with_capacity(self.members.len());
		let mut total_weight = 0.0;

		for (weight, member) in &self.members {
			let weight = ctx.resolve_factor(weight);

			if weight <= 0.0 {
				return Err(invalid(Self::KIND, "member weights must be greater than zero."));
			}

			total_weight += weight;

			factors.push(format!("pow(max({}, {epsilon}), {weight})", member.script(ctx)?));
		}

		let exponent = 1.0 / total_weight;

		Ok(format!("(1 - {impact}) + {impact} * pow({}, {exponent})", factors.join(" * ")))
	}

	pub(crate) fn append(&self, ctx: &SearchContext, function_score: &mut FunctionScore) -> Result<()> {
		append_script(self.script(ctx)?, &self.weight, ctx, function_score);

		Ok(())
	}
}
