pub mod boosted;
pub mod functions;
pub mod scripts;

pub use boosted::BoostedQueriesFunction;
pub use functions::FunctionKind;

use std::{
	collections::HashMap,
	fmt::{Debug, Formatter},
	sync::Arc,
};

use serde::Deserialize;
use time::OffsetDateTime;

use crate::{Error, Result, dsl::FunctionScore};
use cirrus_config::{Config, Factor, FunctionSpec, RescoreChain, Scoring};

/// A contribution to a rescore chain supplied from outside the closed function set.
pub trait ScoreBuilder: Send + Sync {
	fn append(&self, ctx: &SearchContext, function_score: &mut FunctionScore) -> Result<()>;
}

type ExtensionFactory =
	Arc<dyn Fn(&FunctionSpec, &Scoring) -> Result<Arc<dyn ScoreBuilder>> + Send + Sync>;

/// Function types resolvable beyond the built-in [`FunctionKind`] set.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
	factories: HashMap<String, ExtensionFactory>,
}
impl ExtensionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
	where
		F: Fn(&FunctionSpec, &Scoring) -> Result<Arc<dyn ScoreBuilder>> + Send + Sync + 'static,
	{
		self.factories.insert(kind.into(), Arc::new(factory));
	}

	fn resolve(&self, spec: &FunctionSpec, scoring: &Scoring) -> Option<Result<Arc<dyn ScoreBuilder>>> {
		self.factories.get(&spec.kind).map(|factory| factory(spec, scoring))
	}
}
impl Debug for ExtensionRegistry {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_set().entries(self.factories.keys()).finish()
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct PreferRecent {
	pub decay_portion: Option<f64>,
	pub half_life_days: Option<f64>,
}

/// Per-request inputs consumed while a chain is built.
#[derive(Clone)]
pub struct SearchContext {
	/// Namespaces the request searches; `None` means the configured searchable set.
	pub namespaces: Option<Vec<i32>>,
	pub local_search: bool,
	pub with_default_boosts: bool,
	pub user_language: Option<String>,
	pub prefer_recent: Option<PreferRecent>,
	/// Raw request parameters consulted by overridable factors.
	pub overrides: HashMap<String, String>,
	pub now: OffsetDateTime,
	pub extra_score_builders: Vec<Arc<dyn ScoreBuilder>>,
}
impl SearchContext {
	pub fn new(now: OffsetDateTime) -> Self {
		Self {
			namespaces: None,
			local_search: false,
			with_default_boosts: true,
			user_language: None,
			prefer_recent: None,
			overrides: HashMap::new(),
			now,
			extra_score_builders: Vec::new(),
		}
	}

	/// Numeric override when one is named and parses, the configured value otherwise.
	pub fn resolve_factor(&self, factor: &Factor) -> f64 {
		factor
			.override_key()
			.and_then(|key| self.overrides.get(key))
			.and_then(|raw| raw.trim().parse::<f64>().ok())
			.filter(|value| value.is_finite())
			.unwrap_or_else(|| factor.value())
	}
}
impl Default for SearchContext {
	fn default() -> Self {
		Self::new(OffsetDateTime::UNIX_EPOCH)
	}
}
impl Debug for SearchContext {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SearchContext")
			.field("namespaces", &self.namespaces)
			.field("local_search", &self.local_search)
			.field("with_default_boosts", &self.with_default_boosts)
			.field("user_language", &self.user_language)
			.field("prefer_recent", &self.prefer_recent)
			.field("overrides", &self.overrides)
			.field("now", &self.now)
			.field("extra_score_builders", &self.extra_score_builders.len())
			.finish()
	}
}

enum ChainFunction {
	Builtin(FunctionKind),
	Extension(Arc<dyn ScoreBuilder>),
}

/// A rescore profile compiled against the scoring configuration.
pub struct FunctionScoreChain {
	name: String,
	params: RescoreChain,
	functions: Vec<ChainFunction>,
}
impl FunctionScoreChain {
	pub fn new(
		name: &str,
		chain: &RescoreChain,
		scoring: &Scoring,
		registry: &ExtensionRegistry,
	) -> Result<Self> {
		let Some(specs) = chain.functions.as_ref() else {
			return Err(Error::invalid_profile(format!("No functions defined in chain {name}.")));
		};
		let mut functions = Vec::with_capacity(specs.len());

		for spec in specs {
			let function = match FunctionKind::parse(spec, scoring)? {
				Some(kind) => ChainFunction::Builtin(kind),
				None => match registry.resolve(spec, scoring) {
					Some(builder) => ChainFunction::Extension(builder?),
					None =>
						return Err(Error::invalid_profile(format!(
							"Unknown function score type {}.",
							spec.kind
						))),
				},
			};

			functions.push(function);
		}

		Ok(Self {
			name: name.to_string(),
			params: RescoreChain { functions: None, ..chain.clone() },
			functions,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Builds the chain for one request; `None` when no function contributed a clause.
	pub fn build_rescore_query(&self, ctx: &SearchContext) -> Result<Option<FunctionScore>> {
		let mut function_score = FunctionScore::from_chain(&self.params);

		for function in &self.functions {
			match function {
				ChainFunction::Builtin(kind) => kind.append(ctx, &mut function_score)?,
				ChainFunction::Extension(builder) => builder.append(ctx, &mut function_score)?,
			}
		}

		if self.params.add_extensions {
			for builder in &ctx.extra_score_builders {
				builder.append(ctx, &mut function_score)?;
			}
		}

		tracing::debug!(
			chain = %self.name,
			functions = function_score.len(),
			"Rescore chain built."
		);

		if function_score.is_empty() { Ok(None) } else { Ok(Some(function_score)) }
	}
}

/// Every configured chain, compiled once at startup.
pub struct RescoreChains {
	chains: HashMap<String, FunctionScoreChain>,
}
impl RescoreChains {
	pub fn compile(cfg: &Config, registry: &ExtensionRegistry) -> Result<Self> {
		let mut chains = HashMap::with_capacity(cfg.rescore.chains.len());

		for (name, chain) in &cfg.rescore.chains {
			chains.insert(name.clone(), FunctionScoreChain::new(name, chain, &cfg.scoring, registry)?);
		}

		tracing::info!(chains = chains.len(), "Rescore chains compiled.");

		Ok(Self { chains })
	}

	pub fn get(&self, name: &str) -> Result<&FunctionScoreChain> {
		self.chains
			.get(name)
			.ok_or_else(|| Error::UnknownProfile { kind: "rescore", name: name.to_string() })
	}

	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.chains.keys().map(String::as_str).collect();

		names.sort_unstable();

		names
	}

	pub fn len(&self) -> usize {
		self.chains.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chains.is_empty()
	}
}
